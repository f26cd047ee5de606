//! Operator-facing presentation: status colours, diff rendering and prompts.

mod changeset;
mod palette;
mod prompt;
mod status;

pub use changeset::{
    action_tone, format_change_set, render_change_set, ChangeSetFetcher, ChangeSetTree,
    NestedChange, DEFAULT_MAX_NESTING_DEPTH,
};
pub use palette::{AnsiPalette, Palette, PlainPalette, Tone};
pub use prompt::{Confirm, TerminalPrompt};
pub use status::{
    classify, colourise, colourise_status, status_symbol, StatusCategory, StatusRep,
};

#[cfg(test)]
pub(crate) use prompt::MockConfirm;
