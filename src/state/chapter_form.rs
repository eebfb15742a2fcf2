pub(crate) const WARNING_DISPLAY_MS: i32 = 2_000;

pub(crate) const EMPTY_HEADING_WARNING: &str = "Chapter heading cannot be empty";

/// The "add chapter" control above the chapter list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum ChapterForm {
    #[default]
    Collapsed,
    EnteringTitle {
        heading: String,
        warning: bool,
        /// Blank submits so far; identifies the warning a timer may clear.
        warnings: u32,
        submitting: bool,
    },
}

impl ChapterForm {
    pub(crate) fn expand(&mut self) {
        if matches!(self, Self::Collapsed) {
            *self = Self::EnteringTitle {
                heading: String::new(),
                warning: false,
                warnings: 0,
                submitting: false,
            };
        }
    }

    pub(crate) fn cancel(&mut self) {
        *self = Self::Collapsed;
    }

    pub(crate) fn is_expanded(&self) -> bool {
        matches!(self, Self::EnteringTitle { .. })
    }

    pub(crate) fn set_heading(&mut self, value: String) {
        if let Self::EnteringTitle { heading, .. } = self {
            *heading = value;
        }
    }

    pub(crate) fn show_warning(&self) -> bool {
        matches!(self, Self::EnteringTitle { warning: true, .. })
    }

    /// Token for the warning on screen, handed back to [`ChapterForm::clear_warning`].
    pub(crate) fn warning_token(&self) -> Option<u32> {
        match self {
            Self::EnteringTitle {
                warning: true,
                warnings,
                ..
            } => Some(*warnings),
            _ => None,
        }
    }

    pub(crate) fn is_submitting(&self) -> bool {
        matches!(self, Self::EnteringTitle { submitting: true, .. })
    }

    /// Heading to create, or `None` when there is nothing to send.
    ///
    /// A blank heading raises the warning instead; the caller hides it again
    /// after [`WARNING_DISPLAY_MS`]. A second submit while one is running is
    /// ignored.
    pub(crate) fn submit(&mut self) -> Option<String> {
        let Self::EnteringTitle {
            heading,
            warning,
            warnings,
            submitting,
        } = self
        else {
            return None;
        };
        if *submitting {
            return None;
        }
        let trimmed = heading.trim();
        if trimmed.is_empty() {
            *warning = true;
            *warnings += 1;
            return None;
        }
        *submitting = true;
        Some(trimmed.to_string())
    }

    /// Hide the warning raised by the blank submit `token`; a later warning
    /// stays up.
    pub(crate) fn clear_warning(&mut self, token: u32) {
        if let Self::EnteringTitle {
            warning, warnings, ..
        } = self
        {
            if *warnings == token {
                *warning = false;
            }
        }
    }

    pub(crate) fn created(&mut self) {
        *self = Self::Collapsed;
    }

    /// Keep what was typed so the user can retry.
    pub(crate) fn failed(&mut self) {
        if let Self::EnteringTitle { submitting, .. } = self {
            *submitting = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_and_cancel() {
        let mut form = ChapterForm::default();
        assert!(!form.is_expanded());
        form.expand();
        assert!(form.is_expanded());
        assert!(!form.show_warning());
        form.cancel();
        assert_eq!(form, ChapterForm::Collapsed);
    }

    #[test]
    fn empty_heading_warns_without_request() {
        let mut form = ChapterForm::default();
        form.expand();
        form.set_heading("  ".to_string());
        assert_eq!(form.submit(), None);
        assert!(form.show_warning());
        assert!(!form.is_submitting());

        let token = form.warning_token().expect("warning shown");
        form.clear_warning(token);
        assert!(!form.show_warning());
        assert_eq!(form.warning_token(), None);
        assert!(form.is_expanded());
    }

    #[test]
    fn stale_timer_keeps_newer_warning() {
        let mut form = ChapterForm::default();
        form.expand();
        assert_eq!(form.submit(), None);
        let first = form.warning_token().expect("first warning");
        assert_eq!(form.submit(), None);
        let second = form.warning_token().expect("second warning");
        assert_ne!(first, second);

        form.clear_warning(first);
        assert!(form.show_warning());
        form.clear_warning(second);
        assert!(!form.show_warning());
    }

    #[test]
    fn heading_submits_once() {
        let mut form = ChapterForm::default();
        form.expand();
        form.set_heading(" Epilogue ".to_string());
        assert_eq!(form.submit(), Some("Epilogue".to_string()));
        assert!(form.is_submitting());
        assert_eq!(form.submit(), None);

        form.created();
        assert!(!form.is_expanded());
    }

    #[test]
    fn failure_keeps_input() {
        let mut form = ChapterForm::default();
        form.expand();
        form.set_heading("Part".to_string());
        assert!(form.submit().is_some());
        form.failed();
        assert_eq!(
            form,
            ChapterForm::EnteringTitle {
                heading: "Part".to_string(),
                warning: false,
                warnings: 0,
                submitting: false,
            }
        );
        assert_eq!(form.submit(), Some("Part".to_string()));
    }

    #[test]
    fn collapsed_form_ignores_input() {
        let mut form = ChapterForm::default();
        form.set_heading("x".to_string());
        assert_eq!(form, ChapterForm::Collapsed);
        assert_eq!(form.submit(), None);
    }
}
