//! API version negotiation.
//!
//! The client lists the API classes it intends to use with the version it
//! was built against. Each entry is answered in place: either with the
//! class's handler, to be echoed as `api_h` on privileged commands, or with
//! an `error` member. One bad entry never hides the answer to another.

use serde_json::{Map, Value};
use strum::VariantNames;

use crate::api_version::ApiClass;
use crate::rpc::{CommandContext, CommandError, OutcomeBuilder, ParamArray, ParamError, Params};

const ENTRIES_FIELD: &str = "api_vers";
const TYPE_FIELD: &str = "type";

pub(super) fn sync(
    context: &CommandContext<'_>,
    params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let entries = params.array(ENTRIES_FIELD)?;

    let mut answers = Vec::with_capacity(entries.len());
    for index in 0..entries.len() {
        answers.push(negotiate(context, &entries, index, outcome)?);
    }

    let mut result = Map::new();
    result.insert(ENTRIES_FIELD.to_owned(), Value::Array(answers));
    outcome.set_result(result);
    Ok(())
}

fn negotiate(
    context: &CommandContext<'_>,
    entries: &ParamArray<'_>,
    index: usize,
    outcome: &mut OutcomeBuilder,
) -> Result<Value, CommandError> {
    let requested_type = entries
        .values()
        .get(index)
        .and_then(|entry| entry.get(TYPE_FIELD))
        .cloned()
        .unwrap_or(Value::Null);

    let (class, major, minor) = match read_entry(entries, index) {
        Ok(fields) => fields,
        Err(error) => {
            let answer = answer(requested_type, "error", error.to_string());
            outcome.report_param_error(&error);
            return Ok(answer);
        }
    };
    let class: ApiClass = class
        .parse()
        .map_err(|_| CommandError::internal(format!("API class '{class}' is unknown")))?;

    match context.state().api().verify(class, major, minor) {
        Ok(handler) => Ok(answer(requested_type, "api_h", handler.to_owned())),
        Err(error) => {
            outcome.report_execution_error(error.to_string());
            Ok(answer(requested_type, "error", error.to_string()))
        }
    }
}

fn read_entry<'a>(
    entries: &ParamArray<'a>,
    index: usize,
) -> Result<(&'a str, i64, i64), ParamError> {
    let entry = entries.object_at(index)?;
    let class = entry.choice(TYPE_FIELD, ApiClass::VARIANTS)?;
    let major = entry.int("major")?;
    let minor = entry.int("minor")?;
    Ok((class, major, minor))
}

fn answer(requested_type: Value, key: &str, value: String) -> Value {
    let mut entry = Map::new();
    entry.insert(TYPE_FIELD.to_owned(), requested_type);
    entry.insert(key.to_owned(), Value::String(value));
    Value::Object(entry)
}
