//! Multi-step navigation.
//!
//! Step forms show one `.q-step` at a time. The navigator keeps a zero-based
//! index clamped to the available steps, paints the progress bar and counter,
//! and regenerates the Back/Next buttons inside a single actions bar. Next
//! validates only the current step; Back never validates.

use serde::Serialize;

use crate::form::{FormModel, NavControl, NavKind, Scope};
use crate::validation::{FieldValidator, ValidationReport};

const BACK_CLASS: &str = "q-btn q-btn--ghost";

/// Position within a step form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepNavigator {
    index: usize,
    count: usize,
}

impl StepNavigator {
    /// Starts at the first of `count` steps.
    pub const fn new(count: usize) -> Self {
        Self { index: 0, count }
    }

    /// The active step.
    pub const fn index(self) -> usize {
        self.index
    }

    /// Number of steps.
    pub const fn count(self) -> usize {
        self.count
    }

    /// Returns `true` when no later step exists.
    pub const fn is_last(self) -> bool {
        self.index + 1 >= self.count
    }

    /// Pulls the index back into `[0, count - 1]`.
    #[must_use]
    pub const fn clamped(self) -> Self {
        let max = self.count.saturating_sub(1);
        let index = if self.index > max { max } else { self.index };
        Self {
            index,
            count: self.count,
        }
    }

    /// Moves forward one step, never past the last.
    #[must_use]
    pub const fn advanced(self) -> Self {
        Self {
            index: self.index + 1,
            count: self.count,
        }
        .clamped()
    }

    /// Moves back one step, never before the first.
    #[must_use]
    pub const fn retreated(self) -> Self {
        Self {
            index: self.index.saturating_sub(1),
            count: self.count,
        }
    }

    /// The validation scope of the active step.
    pub const fn scope(self) -> Scope {
        if self.count == 0 {
            Scope::Form
        } else {
            Scope::Step(self.index)
        }
    }

    /// Computes what the step chrome should show.
    pub fn view(self, btn_variant: &str) -> StepView {
        #[allow(clippy::cast_precision_loss)]
        let ratio = (self.index + 1) as f64 / self.count.max(1) as f64;
        StepView {
            index: self.index,
            total: self.count,
            progress_width: format!("{:.1}%", ratio * 100.0),
            counter: format!("{} / {}", self.index + 1, self.count),
            show_back: self.index > 0,
            show_next: !self.is_last(),
            submit_visible: self.is_last(),
            next_class: format!("q-btn {btn_variant}"),
        }
    }
}

/// The rendered state of the step chrome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    /// Active step.
    pub index: usize,
    /// Number of steps.
    pub total: usize,
    /// Progress fill width, e.g. `"33.3%"`.
    pub progress_width: String,
    /// Counter text, e.g. `"1 / 3"`.
    pub counter: String,
    /// A Back button is shown.
    pub show_back: bool,
    /// A Next button is shown.
    pub show_next: bool,
    /// The native submit button is shown.
    pub submit_visible: bool,
    /// Classes of the Next button.
    pub next_class: String,
}

impl StepView {
    fn nav_controls(&self) -> Vec<NavControl> {
        let mut nav = Vec::with_capacity(2);
        if self.show_back {
            nav.push(NavControl {
                kind: NavKind::Back,
                label: "Back".to_string(),
                class: BACK_CLASS.to_string(),
            });
        }
        if self.show_next {
            nav.push(NavControl {
                kind: NavKind::Next,
                label: "Next".to_string(),
                class: self.next_class.clone(),
            });
        }
        nav
    }
}

/// Result of a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepMove {
    /// The active step changed.
    Moved {
        /// Previous index.
        from: usize,
        /// New index.
        to: usize,
    },
    /// Nothing to do (not a step form, or already at the boundary).
    Stayed,
    /// The current step failed validation.
    Blocked(ValidationReport),
}

/// Paints the step chrome for the navigator's current position.
///
/// Returns `None` for forms that are not step forms.
pub fn render(model: &mut FormModel) -> Option<StepView> {
    let nav = model.navigator()?;
    let view = nav.view(&model.config().btn_variant);
    model.paint_steps(
        view.index,
        view.progress_width.clone(),
        view.counter.clone(),
        view.nav_controls(),
        view.submit_visible,
    );
    Some(view)
}

/// Validates the current step and advances when it passes.
pub fn next(model: &mut FormModel, validator: &FieldValidator) -> StepMove {
    let Some(nav) = model.navigator() else {
        return StepMove::Stayed;
    };
    let report = validator.validate(model, nav.scope());
    if !report.ok {
        return StepMove::Blocked(report);
    }
    move_to(model, nav, nav.advanced())
}

/// Goes back one step without validating.
pub fn back(model: &mut FormModel) -> StepMove {
    let Some(nav) = model.navigator() else {
        return StepMove::Stayed;
    };
    move_to(model, nav, nav.retreated())
}

/// Re-clamps the index and repaints, after a layout change.
pub fn relayout(model: &mut FormModel) -> Option<StepView> {
    let nav = model.navigator()?;
    model.set_navigator(nav.clamped());
    render(model)
}

fn move_to(model: &mut FormModel, from: StepNavigator, to: StepNavigator) -> StepMove {
    if from.index() == to.index() {
        return StepMove::Stayed;
    }
    model.set_navigator(to);
    render(model);
    tracing::debug!(from = from.index(), to = to.index(), "step changed");
    StepMove::Moved {
        from: from.index(),
        to: to.index(),
    }
}
