use crate::registry::ModelSpec;

/// USD cost of a call at the model's per-million-token prices. Unrounded.
pub fn calculate_cost(spec: &ModelSpec, input_tokens: u64, output_tokens: u64) -> f64 {
    let input = input_tokens as f64 / 1_000_000.0 * spec.input_price_per_million_tokens;
    let output = output_tokens as f64 / 1_000_000.0 * spec.output_price_per_million_tokens;
    input + output
}
