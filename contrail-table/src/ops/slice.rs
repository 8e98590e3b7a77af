use std::collections::BTreeMap;

use contrail_error::{ContrailResult, contrail_bail};
use contrail_protocol::Value;

use crate::ops::{OpOutcome, TableOp, int_value, reject_unknown_keywords};
use crate::{Invocation, Table};

/// Limit `table` to `length` rows starting at `offset`. Bounds are
/// clamped; a missing length runs to the end of the table.
pub fn slice(table: &Table, offset: usize, length: Option<usize>) -> Table {
    let length = length.unwrap_or_else(|| table.num_rows().saturating_sub(offset));
    table.slice(offset, length)
}

/// Method name in the shared capability set.
pub const SLICE: &str = "slice";

pub(crate) fn op() -> TableOp {
    TableOp::new(SLICE, "slice([offset[, length]])", |table, invocation| {
        let (offset, length) = bounds(invocation)?;
        Ok(OpOutcome::Table(slice(table, offset, length)))
    })
}

fn bounds(invocation: &Invocation) -> ContrailResult<(usize, Option<usize>)> {
    match invocation {
        Invocation::Nullary => Ok((0, None)),
        Invocation::Positional(value) => positional_bounds(value),
        Invocation::Keyword(kwargs) => keyword_bounds(None, kwargs),
        Invocation::Mixed(value, kwargs) => {
            keyword_bounds(Some(int_value("slice", value)?), kwargs)
        }
    }
}

fn positional_bounds(value: &Value) -> ContrailResult<(usize, Option<usize>)> {
    if let Some(items) = value.as_list() {
        return match items {
            [offset] => Ok((int_value("slice", offset)?, None)),
            [offset, length] => Ok((
                int_value("slice", offset)?,
                Some(int_value("slice", length)?),
            )),
            _ => contrail_bail!(InvalidArguments: "slice takes an offset and an optional length"),
        };
    }
    Ok((int_value("slice", value)?, None))
}

fn keyword_bounds(
    offset: Option<usize>,
    kwargs: &BTreeMap<String, Value>,
) -> ContrailResult<(usize, Option<usize>)> {
    reject_unknown_keywords("slice", kwargs, &["offset", "length"])?;
    let mut offset = offset;
    if let Some(value) = kwargs.get("offset") {
        if offset.is_some() {
            contrail_bail!(InvalidArguments: "slice got offset both positionally and by keyword");
        }
        offset = Some(int_value("slice", value)?);
    }
    let length = kwargs
        .get("length")
        .map(|value| int_value("slice", value))
        .transpose()?;
    Ok((offset.unwrap_or(0), length))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{column_a, sample_table};

    fn invoke(invocation: Invocation) -> ContrailResult<Table> {
        match op().invoke(&sample_table(), &invocation)? {
            OpOutcome::Table(table) => Ok(table),
            OpOutcome::Scalar(_) => unreachable!("slice returns tables"),
        }
    }

    #[test]
    fn offset_only() {
        let table = invoke(Invocation::Positional(Value::Int(1))).unwrap();
        assert_eq!(column_a(&table), vec![2, 3]);
    }

    #[test]
    fn offset_and_length_as_list() {
        let table = invoke(Invocation::Positional(Value::List(vec![
            Value::Int(1),
            Value::Int(1),
        ])))
        .unwrap();
        assert_eq!(column_a(&table), vec![2]);
    }

    #[test]
    fn keyword_form() {
        let kwargs = [("length".to_string(), Value::Int(2))].into_iter().collect();
        let table = invoke(Invocation::Keyword(kwargs)).unwrap();
        assert_eq!(column_a(&table), vec![1, 2]);
    }

    #[test]
    fn mixed_form() {
        let kwargs = [("length".to_string(), Value::Int(1))].into_iter().collect();
        let table = invoke(Invocation::Mixed(Value::Int(2), kwargs)).unwrap();
        assert_eq!(column_a(&table), vec![3]);
    }

    #[test]
    fn nullary_is_the_whole_table() {
        assert_eq!(invoke(Invocation::Nullary).unwrap().num_rows(), 3);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(invoke(Invocation::Positional(Value::from("x"))).is_err());
        assert!(
            invoke(Invocation::Positional(Value::List(vec![Value::Int(0); 3]))).is_err()
        );
        let unknown = [("limit".to_string(), Value::Int(1))].into_iter().collect();
        assert!(invoke(Invocation::Keyword(unknown)).is_err());
        assert!(invoke(Invocation::Positional(Value::Int(-1))).is_err());
    }
}
