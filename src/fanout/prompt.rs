//! Instruction text sent to the model. The JSON schema written here is the
//! only contract with the model; nothing server-side enforces it.

use super::labels::{QueryType, RoutingFormat};
use super::mode::{Mode, PromptVariant};

const TRANSFORMATION_TYPES: [&str; 6] = [
    "Reformulations",
    "Related Queries",
    "Implicit Queries",
    "Comparative Queries",
    "Entity Expansions",
    "Personalized Queries",
];

const STANDARD_SCHEMA: &str = r#"{
  "generation_details": {
    "target_query_count": <number>,
    "reasoning_for_count": "<reasoning>"
  },
  "expanded_queries": [
    {"query": "...", "type": "...", "user_intent": "...", "reasoning": "..."}
  ]
}"#;

fn routing_schema() -> String {
    let types = QueryType::KNOWN.join(" | ");
    format!(
        r#"{{
  "generation_details": {{
    "target_query_count": 12,
    "reasoning_for_count": "..."
  }},
  "expanded_queries": [
    {{
      "query": "...",
      "type": "{types}",
      "user_intent": "...",
      "reasoning": "...",
      "routing_format": "one_of_allowed_labels",
      "format_reason": "one sentence why this format is best"
    }}
  ]
}}"#
    )
}

pub fn build_prompt(query: &str, mode: Mode, variant: PromptVariant) -> String {
    match variant {
        PromptVariant::Standard => standard_prompt(query, mode),
        PromptVariant::Routing => routing_prompt(query, mode),
    }
}

fn standard_prompt(q: &str, mode: Mode) -> String {
    let min = mode.min_queries();
    let label = mode.label();
    let count_instruction = match mode {
        Mode::Simple => format!(
            "Analyze the user's query: \"{q}\". Based on '{label}', decide an optimal number of queries (≥{min}). \
             For simple queries, {min}-{} queries may suffice. Provide reasoning for your choice.",
            min + 5
        ),
        Mode::Complex => format!(
            "Analyze the user's query: \"{q}\". Based on '{label}', decide an optimal number of queries (≥{min}). \
             For complex queries, {}-{} queries or more may be needed. Provide reasoning.",
            min + 5,
            min + 10
        ),
    };

    format!(
        "You are simulating Google's AI Mode query fan-out process.\n\
         Original query: \"{q}\". Mode: \"{label}\".\n\n\
         {count_instruction}\n\n\
         Generate exactly that many unique queries in JSON format:\n\
         {STANDARD_SCHEMA}"
    )
}

fn routing_prompt(q: &str, mode: Mode) -> String {
    let min = mode.min_queries();
    let label = mode.label();
    let count_instruction = match mode {
        Mode::Simple => format!(
            "First, analyze the user's query: \"{q}\". Based on its complexity and the '{label}' mode, \
             you must decide on an optimal number of queries to generate. \
             This number must be at least {min}. \
             For a straightforward query, generate around {min}-{}. \
             If the query has a few distinct aspects or common follow-ups, aim for {}-{}. \
             Provide brief reasoning for why you chose this number.",
            min + 2,
            min + 3,
            min + 5
        ),
        Mode::Complex => format!(
            "First, analyze the user's query: \"{q}\". Based on its complexity and the '{label}' mode, \
             you must decide on an optimal number of queries to generate. \
             This number must be at least {min}. \
             For multifaceted queries that span comparisons, procedures, specs, or trade-offs, \
             generate {}-{} or more. \
             Provide brief reasoning for your number.",
            min + 5,
            min + 10
        ),
    };

    let types: String = TRANSFORMATION_TYPES
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {t}\n", i + 1))
        .collect();

    let formats = RoutingFormat::KNOWN.join(", ");
    let schema = routing_schema();

    format!(
        "You are simulating Google's AI Mode query fan-out for generative search systems.\n\
         The user's original query is: \"{q}\". The selected mode is: \"{label}\".\n\n\
         Your first task is to determine the total number of queries to generate and the reasoning for this number:\n\
         {count_instruction}\n\n\
         Once you have decided on the number and the reasoning, generate exactly that many unique synthetic queries.\n\
         Each of the following transformation types MUST be represented at least once, if the total allows:\n\
         {types}\n\
         The 'reasoning' field for each query should explain why that query was generated \
         (tie it to the original query, its type, and user intent). \
         Do NOT include queries dependent on real-time user history or geolocation.\n\n\
         For EACH expanded query, also identify the most likely CONTENT TYPE / FORMAT the routing system would prefer \
         for retrieval and synthesis (e.g., a how-to should route to 'how_to_steps' or a video transcript; \
         comparisons to 'comparison_table' or 'buyers_guide'). \
         Choose exactly ONE label from this fixed list:\n\
         {formats}.\n\
         Return it in a field named 'routing_format' and give a short 'format_reason' (1 sentence).\n\n\
         Return only a valid JSON object in this exact schema:\n\
         {schema}"
    )
}
