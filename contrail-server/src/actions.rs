use contrail_error::{ContrailResult, contrail_bail, contrail_err};
use contrail_protocol::{Action, ActionResult, ActionType};

use crate::registry::Registry;

/// The admin actions the server advertises.
pub const ACTION_TYPES: &[ActionType] = &[
    ActionType {
        name: "clear",
        description: "Clear (delete) all flights. Persisted parquet files are not affected.",
    },
    ActionType {
        name: "shutdown",
        description: "Shut down this server.",
    },
    ActionType {
        name: "delete",
        description: "Delete a flight and its parquet file, if existing. [body == \"<FLIGHT_ID>\"]",
    },
    ActionType {
        name: "save",
        description: "Save a flight as a parquet file. [body == \"<FLIGHT_ID> <FILENAME>\"]",
    },
];

/// Route a registry-facing action. `shutdown` is handled by the service
/// before this is consulted.
pub(crate) fn handle(registry: &Registry, action: &Action) -> ContrailResult<Vec<ActionResult>> {
    match action.name.as_str() {
        "clear" => {
            registry.clear();
            Ok(vec![ActionResult::new("Successfully cleared all flights")])
        }
        "save" => {
            let Some((id, name)) = action.body.split_once(' ') else {
                contrail_bail!(InvalidArguments: "save expects '<id> <filename>', got '{}'", action.body);
            };
            let message = if registry.save(id, name)? {
                format!("Successfully saved flight {} as {}", id, name)
            } else {
                format!("Could not save {}. Flight not found.", id)
            };
            Ok(vec![ActionResult::new(message)])
        }
        "delete" => {
            let id = action.body.as_str();
            if id.is_empty() {
                contrail_bail!(InvalidArguments: "delete expects '<id>'");
            }
            let message = if registry.delete(id)? {
                format!("Successfully deleted flight {}", id)
            } else {
                format!("Could not delete {}. Flight not found.", id)
            };
            Ok(vec![ActionResult::new(message)])
        }
        other => Err(contrail_err!(UnknownAction: "{}", other)),
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use arrow_array::{Int32Array, RecordBatch};
    use arrow_schema::{DataType, Field, Schema};
    use contrail_error::ContrailError;
    use contrail_protocol::FlightKey;
    use contrail_table::Table;

    use super::*;

    fn seeded_registry() -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int32, false)]));
        let batch =
            RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from(vec![1]))])
                .unwrap();
        registry
            .store(
                FlightKey::Path(vec!["t".to_string()]),
                Table::try_new(schema, vec![batch]).unwrap(),
            )
            .unwrap();
        (dir, registry)
    }

    #[test]
    fn save_reports_success_and_not_found() {
        let (dir, registry) = seeded_registry();
        let results = handle(&registry, &Action::new("save", "0 out")).unwrap();
        assert_eq!(results[0].message, "Successfully saved flight 0 as out");
        assert!(dir.path().join("out.parquet").exists());

        let results = handle(&registry, &Action::new("save", "9 out")).unwrap();
        assert_eq!(results[0].message, "Could not save 9. Flight not found.");

        assert!(matches!(
            handle(&registry, &Action::new("save", "no-filename")),
            Err(ContrailError::InvalidArguments(_))
        ));
    }

    #[test]
    fn delete_reports_success_and_not_found() {
        let (_dir, registry) = seeded_registry();
        let results = handle(&registry, &Action::new("delete", "0")).unwrap();
        assert_eq!(results[0].message, "Successfully deleted flight 0");
        let results = handle(&registry, &Action::new("delete", "0")).unwrap();
        assert_eq!(results[0].message, "Could not delete 0. Flight not found.");
        assert!(handle(&registry, &Action::new("delete", "")).is_err());
    }

    #[test]
    fn clear_empties_the_registry() {
        let (_dir, registry) = seeded_registry();
        let results = handle(&registry, &Action::new("clear", "")).unwrap();
        assert_eq!(results[0].message, "Successfully cleared all flights");
        assert_eq!(registry.slot_count(), 0);
    }

    #[test]
    fn unknown_actions_are_rejected() {
        let (_dir, registry) = seeded_registry();
        assert!(matches!(
            handle(&registry, &Action::new("vacuum", "")),
            Err(ContrailError::UnknownAction(_))
        ));
    }
}
