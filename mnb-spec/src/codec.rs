//! Bit-exact JSON encode/decode of [`Spec`] documents, plus the structural validation that
//! only needs a single action's shape (as opposed to cross-action state, which belongs to
//! `mnb-planner`, or a single [`Exec`]'s inputs/outputs, which belongs to `mnb-executor`).

use crate::error::{self, Error, Result};
use crate::model::{Action, Exec, Spec, StreamName, Through};
use crate::SUPPORTED_VERSION;
use snafu::{ensure, ResultExt};

/// Parse a specification document, validating its shape and spec version.
pub fn decode(bytes: &[u8]) -> Result<Spec> {
    let spec: Spec = serde_json::from_slice(bytes).context(error::JsonSnafu)?;
    validate(&spec)?;
    Ok(spec)
}

/// Serialize a specification document to its canonical wire form.
pub fn encode(spec: &Spec) -> Result<Vec<u8>> {
    serde_json::to_vec(spec).context(error::JsonSnafu)
}

/// Serialize a specification document to its canonical wire form, pretty-printed.
pub fn encode_pretty(spec: &Spec) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(spec).context(error::JsonSnafu)
}

fn validate(spec: &Spec) -> Result<()> {
    ensure!(
        spec.spec_version.major == SUPPORTED_VERSION.major
            && spec.spec_version.minor <= SUPPORTED_VERSION.minor,
        error::UnsupportedVersionSnafu {
            major: spec.spec_version.major,
            minor: spec.spec_version.minor,
        }
    );

    for action in &spec.actions {
        if let Action::Exec(exec) = action {
            validate_exec(exec)?;
        }
    }
    Ok(())
}

fn validate_exec(exec: &Exec) -> Result<()> {
    for input in &exec.inputs {
        validate_through_direction(&input.through, false)?;
    }
    for output in &exec.outputs {
        validate_through_direction(&output.through, true)?;
        ensure!(
            !matches!(output.through, Through::Dir { .. }),
            error::UnsupportedDirOutputSnafu
        );
    }
    Ok(())
}

fn validate_through_direction(through: &Through, is_output: bool) -> Result<()> {
    let Through::Stream { name } = through else {
        return Ok(());
    };
    let ok = match (is_output, name) {
        (false, StreamName::Stdin) => true,
        (true, StreamName::Stdout) | (true, StreamName::Stderr) => true,
        _ => false,
    };
    ensure!(
        ok,
        error::MisplacedStreamSnafu {
            name: format!("{name:?}").to_uppercase(),
            position: if is_output { "output" } else { "input" },
            expected: if is_output { "STDOUT or STDERR" } else { "STDIN" },
        }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn sample_spec() -> Spec {
        let mut spec = Spec::new(SpecVersion::new(1, 0));
        spec.description = Some("sample".into());
        spec.actions.push(Action::PullImage(PullImage::new("bash:5.2")));
        let mut exec = Exec::new("bash:5.2");
        exec.command = Some(vec!["bash".into(), "-c".into(), "echo hi".into()]);
        exec.outputs.push(Output::new(
            Value::File { path: "out.txt".into() },
            Through::Stream { name: StreamName::Stdout },
        ));
        spec.actions.push(Action::Exec(exec));
        spec
    }

    #[test]
    fn round_trip() {
        let spec = sample_spec();
        let encoded = encode(&spec).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(spec, decoded);
    }

    #[test]
    fn canonical_encoding_matches_wire_example() {
        let json = br#"{"spec_version":"1.0","actions":[]}"#;
        let spec = decode(json).unwrap();
        assert_eq!(encode(&spec).unwrap(), json);
    }

    #[test]
    fn empty_collections_are_omitted() {
        let spec = Spec::new(SpecVersion::new(1, 0));
        let encoded = String::from_utf8(encode(&spec).unwrap()).unwrap();
        assert!(!encoded.contains("description"));
        assert_eq!(encoded, r#"{"spec_version":"1.0","actions":[]}"#);
    }

    #[test]
    fn rejects_stdin_on_output() {
        let mut spec = Spec::new(SpecVersion::new(1, 0));
        let mut exec = Exec::new("bash");
        exec.outputs.push(Output::new(
            Value::File { path: "a".into() },
            Through::Stream { name: StreamName::Stdin },
        ));
        spec.actions.push(Action::Exec(exec));
        let encoded = encode(&spec).unwrap();
        assert!(matches!(
            decode(&encoded),
            Err(Error::MisplacedStream { position: "output", .. })
        ));
    }

    #[test]
    fn rejects_dir_output() {
        let mut spec = Spec::new(SpecVersion::new(1, 0));
        let mut exec = Exec::new("bash");
        exec.outputs.push(Output::new(
            Value::Dir { path: "a".into() },
            Through::Dir { path: "a".into() },
        ));
        spec.actions.push(Action::Exec(exec));
        let encoded = encode(&spec).unwrap();
        assert!(matches!(decode(&encoded), Err(Error::UnsupportedDirOutput)));
    }

    #[test]
    fn rejects_unsupported_version() {
        let json = br#"{"spec_version":"2.0","actions":[]}"#;
        assert!(matches!(
            decode(json),
            Err(Error::UnsupportedVersion { major: 2, minor: 0 })
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(decode(b"not json"), Err(Error::Json { .. })));
    }
}
