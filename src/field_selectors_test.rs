#[cfg(test)]
mod tests {
    use crate::field_selectors::*;
    use serde_json::json;

    fn run(name: &str, namespace: &str) -> serde_json::Value {
        json!({"metadata": {"name": name, "namespace": namespace}})
    }

    #[test]
    fn test_parse_operators() {
        let selector = FieldSelector::parse("metadata.name=a,metadata.namespace!=b").unwrap();
        let reqs = selector.requirements();

        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].operator, FieldOperator::Equals);
        assert_eq!(reqs[1].operator, FieldOperator::NotEquals);
        assert_eq!(reqs[1].value, "b");

        let selector = FieldSelector::parse("metadata.name==a").unwrap();
        assert_eq!(selector.requirements()[0].value, "a");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(FieldSelector::parse("metadata.name").is_err());
        assert!(FieldSelector::parse("=value").is_err());
        assert!(FieldSelector::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_matches_name_and_namespace() {
        let selector = FieldSelector::parse("metadata.name=run-1,metadata.namespace=ci").unwrap();

        assert!(selector.matches(&run("run-1", "ci")).unwrap());
        assert!(!selector.matches(&run("run-2", "ci")).unwrap());
        assert!(!selector.matches(&run("run-1", "default")).unwrap());

        let selector = FieldSelector::parse("metadata.name!=run-1").unwrap();
        assert!(selector.matches(&run("run-2", "ci")).unwrap());
    }

    #[test]
    fn test_unsupported_field_is_bad_request() {
        let selector = FieldSelector::parse("spec.serviceAccountName=builder").unwrap();

        assert!(selector.validate().unwrap_err().is_bad_request());
        assert!(selector.matches(&run("run-1", "ci")).is_err());
    }

    #[test]
    fn test_extract_preregistered_field_value() {
        let obj = run("run-1", "ci");
        assert_eq!(
            extract_preregistered_field_value(&obj, "metadata.name").as_deref(),
            Some("run-1")
        );
        assert_eq!(extract_preregistered_field_value(&obj, "spec.timeout"), None);
    }
}
