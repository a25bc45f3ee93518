//! Metadata file parsing: turns a comma-separated `L(name)value` program
//! into the immutable op-code sequence the engine executes.

use crate::error::{MetaError, Result};

/// The component letter an op code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// System (`S`) — marks the start/end of the whole program.
    System,
    /// Application (`A`) — marks the start/end of a process.
    Application,
    /// Process (`P`) — CPU work (`run`).
    Process,
    /// Input (`I`) — an input I/O operation (e.g. `hdd`, `keyboard`).
    Input,
    /// Output (`O`) — an output I/O operation (e.g. `hdd`, `monitor`).
    Output,
    /// Memory (`M`) — `allocate`/`access` ops handled by the MMU.
    Memory,
}

impl Component {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'S' => Some(Self::System),
            'A' => Some(Self::Application),
            'P' => Some(Self::Process),
            'I' => Some(Self::Input),
            'O' => Some(Self::Output),
            'M' => Some(Self::Memory),
            _ => None,
        }
    }

    /// Whether this component issues an I/O operation (runs on a worker
    /// thread via C5).
    #[must_use]
    pub fn is_io(self) -> bool {
        matches!(self, Self::Input | Self::Output)
    }
}

/// A single read-only instruction from the metadata program.
///
/// `value` is mutable only for the currently-executing `P` op under RR-P
/// slicing, mutated in place by the engine since each process occupies
/// disjoint indices of the same shared program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpCode {
    /// The component this op code belongs to.
    pub component: Component,
    /// The operation name (e.g. `"start"`, `"run"`, `"hdd"`, `"allocate"`).
    pub name: String,
    /// The operation's integer argument, interpreted per component.
    pub value: i64,
}

/// Parses the full metadata file contents into the op-code program.
///
/// Validates that the program starts with exactly one `S(start)0`, ends
/// with exactly one `S(end)0`, and that every `A(start)` is later matched
/// by an `A(end)` with no intervening imbalance.
pub fn parse(contents: &str) -> Result<Vec<OpCode>> {
    let trimmed = contents.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);

    let mut ops = Vec::new();
    for raw_token in trimmed.split(',') {
        let token = raw_token.trim();
        if token.is_empty() {
            continue;
        }
        ops.push(parse_token(token)?);
    }

    validate_program(&ops)?;
    Ok(ops)
}

fn parse_token(token: &str) -> Result<OpCode> {
    let mut chars = token.chars();
    let letter = chars.next().ok_or_else(|| MetaError::MalformedToken { token: token.to_string() })?;
    let component = Component::from_letter(letter)
        .ok_or_else(|| MetaError::UnknownComponent { letter, token: token.to_string() })?;

    let rest = chars.as_str();
    let open = rest.find('(').ok_or_else(|| MetaError::MalformedToken { token: token.to_string() })?;
    let close = rest.find(')').ok_or_else(|| MetaError::MalformedToken { token: token.to_string() })?;
    if open != 0 || close <= open {
        return Err(MetaError::MalformedToken { token: token.to_string() }.into());
    }
    let name = rest[open + 1..close].to_string();
    let value_str = &rest[close + 1..];
    let value: i64 = value_str
        .parse()
        .map_err(|_| MetaError::MalformedToken { token: token.to_string() })?;

    Ok(OpCode { component, name, value })
}

fn validate_program(ops: &[OpCode]) -> Result<()> {
    let is_sys_start = |op: &OpCode| matches!(op.component, Component::System) && op.name == "start";
    let is_sys_end = |op: &OpCode| matches!(op.component, Component::System) && op.name == "end";

    let starts_correctly = ops.first().is_some_and(is_sys_start);
    let ends_correctly = ops.last().is_some_and(is_sys_end);
    if !starts_correctly || !ends_correctly {
        return Err(MetaError::MissingStartOrEnd.into());
    }

    let mut depth = 0i32;
    for (index, op) in ops.iter().enumerate() {
        if matches!(op.component, Component::Application) {
            match op.name.as_str() {
                "start" => depth += 1,
                "end" => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(MetaError::UnbalancedProcessMarkers { index }.into());
                    }
                }
                _ => {}
            }
        }
    }
    if depth != 0 {
        return Err(MetaError::UnbalancedProcessMarkers { index: ops.len() }.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_process_program() {
        let ops = parse("S(start)0, A(start)0, P(run)3, A(end)0, S(end)0.").unwrap();
        assert_eq!(ops.len(), 5);
        assert_eq!(ops[2].name, "run");
        assert_eq!(ops[2].value, 3);
        assert!(matches!(ops[2].component, Component::Process));
    }

    #[test]
    fn rejects_missing_system_markers() {
        let err = parse("A(start)0, P(run)3, A(end)0.").unwrap_err();
        assert!(matches!(err, crate::error::SimError::Meta(MetaError::MissingStartOrEnd)));
    }

    #[test]
    fn rejects_unbalanced_application_markers() {
        let err = parse("S(start)0, A(start)0, A(start)0, A(end)0, S(end)0.").unwrap_err();
        assert!(matches!(err, crate::error::SimError::Meta(MetaError::UnbalancedProcessMarkers { .. })));
    }

    #[test]
    fn rejects_unknown_component_letter() {
        let err = parse("S(start)0, Z(foo)0, S(end)0.").unwrap_err();
        assert!(matches!(err, crate::error::SimError::Meta(MetaError::UnknownComponent { letter: 'Z', .. })));
    }

    #[test]
    fn memory_ops_are_decoded_by_the_mmu_not_the_parser() {
        let ops = parse("S(start)0, A(start)0, M(allocate)2002500, A(end)0, S(end)0.").unwrap();
        assert_eq!(ops[2].value, 2_002_500, "the parser keeps the raw packed value; decoding is the MMU's job");
    }
}
