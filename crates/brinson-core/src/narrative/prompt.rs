/// Build the user message sent to the model for one attribution table.
///
/// The table is the exported CSV of the enriched table; effects are already
/// computed, so the model is asked to interpret rather than recompute.
pub fn build_prompt(table_csv: &str) -> String {
    format!(
        "You are reviewing a single-period Brinson performance attribution of a fund \
against its benchmark. Weights are fractions of total value; effects are in the \
same unit as the returns.\n\
\n\
Columns: segment_id, fund_weight, benchmark_weight, fund_return, benchmark_return, \
allocation_effect, selection_effect, interaction_effect, total_effect.\n\
\n\
{}\n\
\n\
Explain which segments and which effects drove the excess return, and name the \
top three risks in the positioning. Respond with JSON only: \
{{\"insights\": \"markdown bullet points\", \"risks\": [\"risk 1\", \"risk 2\", \"risk 3\"]}}",
        table_csv.trim_end()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_table_and_schema() {
        let prompt = build_prompt("segment_id,total_effect\nTech,0.02\n");
        assert!(prompt.contains("segment_id,total_effect\nTech,0.02\n\n"));
        assert!(prompt.contains(r#"{"insights":"#));
        assert!(prompt.contains("top three risks"));
    }
}
