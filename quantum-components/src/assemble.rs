use quantum_types::{ComponentPayload, MicroFunctions, QuantumResponse};

/// Bundle resolved components, the static micro-function table and the
/// chosen next intents into a response.
pub fn assemble(
    components: ComponentPayload,
    micro_functions: &MicroFunctions,
    next_intents: Vec<String>,
) -> QuantumResponse {
    QuantumResponse {
        components,
        micro_functions: micro_functions.clone(),
        next_intents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_micro_functions;
    use serde_json::json;

    #[test]
    fn response_carries_micro_functions_verbatim() {
        let table = default_micro_functions();
        let resp = assemble(
            ComponentPayload::new(),
            &table,
            vec!["a".into(), "b".into()],
        );
        assert_eq!(resp.micro_functions, table);
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["components"], json!({}));
        assert_eq!(v["nextIntents"], json!(["a", "b"]));
        assert!(v["microFunctions"]["formatDate"].is_string());
    }
}
