use crate::models::{parse_chapter_list, BookSummary, SummaryDetails};

pub(crate) const POPUP_CLOSE_DELAY_MS: i32 = 50;

/// Which document the details popup is editing, if any.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) enum PopupMode {
    #[default]
    Hidden,
    /// Filling in a summary that does not exist on the server yet.
    Create(BookSummary),
    Edit(BookSummary),
}

/// Form state behind the summary details popup.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PopupState {
    mode: PopupMode,
    pub fields: SummaryDetails,
    /// Comma separated chapter headings; only used when creating.
    pub chapters: String,
    pub error: Option<String>,
    pub submitting: bool,
    closing: bool,
}

impl PopupState {
    pub(crate) fn open_create() -> Self {
        Self {
            mode: PopupMode::Create(BookSummary::default()),
            ..Self::default()
        }
    }

    pub(crate) fn open_edit(summary: &BookSummary) -> Self {
        Self {
            fields: summary.details(),
            mode: PopupMode::Edit(summary.clone()),
            ..Self::default()
        }
    }

    /// Stays true while closing; only [`PopupState::hidden`] takes it down.
    pub(crate) fn is_visible(&self) -> bool {
        !matches!(self.mode, PopupMode::Hidden)
    }

    /// Closing has started; inputs and buttons are disabled until hidden.
    pub(crate) fn is_closing(&self) -> bool {
        self.closing
    }

    pub(crate) fn is_create(&self) -> bool {
        matches!(self.mode, PopupMode::Create(_))
    }

    /// Start hiding; the caller finishes with [`PopupState::hidden`] after
    /// [`POPUP_CLOSE_DELAY_MS`].
    ///
    /// Returns false when already closing or hidden, so only one close timer
    /// is armed.
    pub(crate) fn begin_close(&mut self) -> bool {
        if self.closing || !self.is_visible() {
            return false;
        }
        self.closing = true;
        self.submitting = false;
        true
    }

    pub(crate) fn hidden() -> Self {
        Self::default()
    }

    pub(crate) fn chapter_headings(&self) -> Vec<String> {
        parse_chapter_list(&self.chapters)
    }

    /// The document to submit, with the form's details applied.
    ///
    /// `None` when hidden or when the title is blank (in which case
    /// `error` is set).
    pub(crate) fn prepare_submit(&mut self) -> Option<BookSummary> {
        if self.closing {
            return None;
        }
        let mut summary = match &self.mode {
            PopupMode::Hidden => return None,
            PopupMode::Create(s) | PopupMode::Edit(s) => s.clone(),
        };
        if self.fields.title.trim().is_empty() {
            self.error = Some("Title is required".to_string());
            return None;
        }
        summary.apply_details(&self.fields);
        self.error = None;
        self.submitting = true;
        Some(summary)
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.submitting = false;
    }
}
