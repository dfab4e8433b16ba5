use snafu::Snafu;

/// Errors raised while ordering a specification's actions.
///
/// These all depend on the relationships between actions (who produces what, who
/// depends on whom); shape errors scoped to a single action belong to `mnb_spec::codec`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("image '{image_name}' is produced by more than one action"))]
    ImageSpecConflict { image_name: String },

    #[snafu(display("exec action depends on image '{image_name}', which no action produces"))]
    MissingImageSpec { image_name: String },

    #[snafu(display("value at path '{path}' is produced by more than one action"))]
    ProducerConflict { path: String },

    #[snafu(display(
        "dependency graph has a cycle; unable to place {remaining} of {total} action(s)"
    ))]
    CycleDetected { remaining: usize, total: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
