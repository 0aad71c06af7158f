//! Output shape selection: return an engine handle or a local frame.

use serde::{Deserialize, Serialize};

use shardcast_core::CoreResult;

use crate::table::{RemoteFrame, Table};

/// Caller preferences for the shape of a job's result.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Return an engine handle even when every input was local.
    #[serde(default)]
    pub force_native: bool,
    /// Collect the whole result into this process. Takes precedence over `force_native`.
    #[serde(default)]
    pub as_local: bool,
}

impl OutputOptions {
    pub fn native() -> Self {
        Self {
            force_native: true,
            as_local: false,
        }
    }

    pub fn local() -> Self {
        Self {
            force_native: false,
            as_local: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutputKind {
    Local,
    Native,
}

/// Stay distributed if any input was distributed, unless told otherwise.
pub fn select_output(any_input_native: bool, options: OutputOptions) -> OutputKind {
    if options.as_local {
        OutputKind::Local
    } else if options.force_native || any_input_native {
        OutputKind::Native
    } else {
        OutputKind::Local
    }
}

impl OutputKind {
    /// Shape a collected job result.
    pub fn apply(self, result: RemoteFrame) -> CoreResult<Table> {
        match self {
            OutputKind::Native => Ok(Table::Remote(result)),
            OutputKind::Local => result.collect().map(Table::Local),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_inputs_stay_local_by_default() {
        assert_eq!(select_output(false, OutputOptions::default()), OutputKind::Local);
    }

    #[test]
    fn native_inputs_stay_native() {
        assert_eq!(select_output(true, OutputOptions::default()), OutputKind::Native);
    }

    #[test]
    fn force_native_wins_over_local_inputs() {
        assert_eq!(select_output(false, OutputOptions::native()), OutputKind::Native);
    }

    #[test]
    fn as_local_wins_over_everything() {
        let both = OutputOptions {
            force_native: true,
            as_local: true,
        };
        assert_eq!(select_output(true, both), OutputKind::Local);
        assert_eq!(select_output(true, OutputOptions::local()), OutputKind::Local);
    }
}
