//! Chained construction helpers mirroring the shape an embedded scripting DSL would produce.
//!
//! These append to the same ordered `Vec`s the codec populates, so a spec assembled with a
//! builder and one decoded from JSON are structurally identical.

use crate::model::{
    Action, BuildArg, BuildImage, Exec, FromGit, Input, Output, PullImage, Spec, SpecVersion,
    Through, Value,
};

pub struct SpecBuilder {
    spec: Spec,
}

impl SpecBuilder {
    pub fn new(spec_version: SpecVersion) -> Self {
        Self {
            spec: Spec::new(spec_version),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    pub fn pull_image(mut self, image_name: impl Into<String>) -> Self {
        self.spec
            .actions
            .push(Action::PullImage(PullImage::new(image_name)));
        self
    }

    pub fn build_image(mut self, build: BuildImage) -> Self {
        self.spec.actions.push(Action::BuildImage(build));
        self
    }

    pub fn exec(mut self, exec: Exec) -> Self {
        self.spec.actions.push(Action::Exec(exec));
        self
    }

    pub fn build(self) -> Spec {
        self.spec
    }
}

pub struct BuildImageBuilder {
    build: BuildImage,
}

impl BuildImageBuilder {
    pub fn new(image_name: impl Into<String>, context_path: impl Into<String>) -> Self {
        Self {
            build: BuildImage::new(image_name, context_path),
        }
    }

    pub fn dockerfile_path(mut self, path: impl Into<String>) -> Self {
        self.build.dockerfile_path = Some(path.into());
        self
    }

    pub fn build_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.build.build_args.push(BuildArg {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn from_git(mut self, repo: impl Into<String>, rev: impl Into<String>) -> Self {
        self.build.from_git = Some(FromGit {
            repo: repo.into(),
            rev: rev.into(),
        });
        self
    }

    pub fn extra_tag(mut self, tag: impl Into<String>) -> Self {
        self.build.extra_tags.push(tag.into());
        self
    }

    pub fn build(self) -> BuildImage {
        self.build
    }
}

pub struct ExecBuilder {
    exec: Exec,
}

impl ExecBuilder {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            exec: Exec::new(image_name),
        }
    }

    pub fn command(mut self, command: Vec<String>) -> Self {
        self.exec.command = Some(command);
        self
    }

    pub fn entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.exec.entrypoint = Some(entrypoint.into());
        self
    }

    pub fn workdir(mut self, workdir: impl Into<String>) -> Self {
        self.exec.workdir = Some(workdir.into());
        self
    }

    pub fn input(mut self, value: Value, through: Through) -> Self {
        self.exec.inputs.push(Input::new(value, through));
        self
    }

    pub fn output(mut self, value: Value, through: Through) -> Self {
        self.exec.outputs.push(Output::new(value, through));
        self
    }

    pub fn build(self) -> Exec {
        self.exec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StreamName;

    #[test]
    fn builder_matches_hand_assembled_spec() {
        let built = SpecBuilder::new(SpecVersion::new(1, 0))
            .pull_image("bash:5.2")
            .exec(
                ExecBuilder::new("bash:5.2")
                    .command(vec!["bash".into(), "-c".into(), "echo hi".into()])
                    .output(
                        Value::File { path: "out.txt".into() },
                        Through::Stream { name: StreamName::Stdout },
                    )
                    .build(),
            )
            .build();

        let mut hand = Spec::new(SpecVersion::new(1, 0));
        hand.actions.push(Action::PullImage(PullImage::new("bash:5.2")));
        let mut exec = Exec::new("bash:5.2");
        exec.command = Some(vec!["bash".into(), "-c".into(), "echo hi".into()]);
        exec.outputs.push(Output::new(
            Value::File { path: "out.txt".into() },
            Through::Stream { name: StreamName::Stdout },
        ));
        hand.actions.push(Action::Exec(exec));

        assert_eq!(built, hand);
    }
}
