use orchestrator_core::InstanceId;

/// Builds a `command_id` of the form `"<instance_id>:<attempt>"`, the
/// correlation id format spec §4.1 mandates for `assign_device`.
pub fn command_id(instance_id: &InstanceId, attempt: u32) -> String {
    format!("{}:{}", instance_id, attempt)
}

/// Splits a correlation id back into its instance id and attempt number.
/// Returns `None` if the id doesn't have the `"<instance_id>:<attempt>"`
/// shape (e.g. it came from some other command entirely).
pub fn parse_command_id(id: &str) -> Option<(InstanceId, u32)> {
    let (instance_part, attempt_part) = id.rsplit_once(':')?;
    let attempt: u32 = attempt_part.parse().ok()?;
    Some((InstanceId::from(instance_part), attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_parses_round_trip() {
        let iid = InstanceId::for_device("DRT", "ACM0");
        let id = command_id(&iid, 2);
        assert_eq!(id, "DRT:ACM0:2");
        let (parsed_iid, attempt) = parse_command_id(&id).unwrap();
        assert_eq!(parsed_iid, iid);
        assert_eq!(attempt, 2);
    }

    #[test]
    fn rejects_ids_without_an_attempt_suffix() {
        assert!(parse_command_id("not-a-correlation-id").is_none());
    }
}
