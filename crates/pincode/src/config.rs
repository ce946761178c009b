//! Widget configuration: the partial [`PincodeOptions`] a caller supplies and
//! the immutable [`PincodeConfig`] it is merged into.

use std::fmt;
use std::sync::Arc;

use pincode_dom::StyleRules;

/// Called once when a widget has been mounted.
pub type OnLoad = Arc<dyn Fn() + Send + Sync>;

/// Called after every reconcile with the value and the affected cell index
/// (`None` when the value is empty).
pub type OnInput = Arc<dyn Fn(&str, Option<usize>) + Send + Sync>;

/// Called whenever a reconcile leaves the value exactly `length` characters
/// long.
pub type OnComplete = Arc<dyn Fn(&str) + Send + Sync>;

/// Fully resolved widget configuration. Built once per widget with
/// [`PincodeConfig::merge`] and never changed afterwards.
#[derive(Clone)]
pub struct PincodeConfig {
    /// Focus cell 0 right after mounting.
    pub auto_focus: bool,
    /// Escape clears the value and blurs the input.
    pub allow_escape: bool,
    /// Pasted text is accepted.
    pub allow_paste: bool,
    /// Mask entered characters behind [`placeholder`](Self::placeholder).
    pub secure: bool,
    /// Glyph shown for masked characters.
    pub placeholder: char,
    /// Strip everything but ASCII digits from the value.
    pub force_digits: bool,
    /// Arrow keys, click, and backspace operate on the caret position.
    /// Ignored in secure mode.
    pub enable_navigation: bool,
    /// Number of cells when the input has no positive `maxlength`. Always at
    /// least 1.
    pub length: usize,
    /// Style rules injected as a per-widget `<style>` element.
    pub styles: StyleRules,
    /// See [`OnLoad`].
    pub on_load: Option<OnLoad>,
    /// See [`OnInput`].
    pub on_input: Option<OnInput>,
    /// See [`OnComplete`].
    pub on_complete: Option<OnComplete>,
}

impl Default for PincodeConfig {
    fn default() -> Self {
        Self {
            auto_focus: false,
            allow_escape: true,
            allow_paste: true,
            secure: false,
            placeholder: '•',
            force_digits: true,
            enable_navigation: true,
            length: 6,
            styles: StyleRules::new(),
            on_load: None,
            on_input: None,
            on_complete: None,
        }
    }
}

impl fmt::Debug for PincodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PincodeConfig")
            .field("auto_focus", &self.auto_focus)
            .field("allow_escape", &self.allow_escape)
            .field("allow_paste", &self.allow_paste)
            .field("secure", &self.secure)
            .field("placeholder", &self.placeholder)
            .field("force_digits", &self.force_digits)
            .field("enable_navigation", &self.enable_navigation)
            .field("length", &self.length)
            .field("styles", &self.styles)
            .field("on_load", &self.on_load.is_some())
            .field("on_input", &self.on_input.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl PincodeConfig {
    /// Overlay `options` on `self`. Unset options keep the current value;
    /// style rules are deep-merged.
    pub fn merge(mut self, options: PincodeOptions) -> Self {
        let PincodeOptions {
            auto_focus,
            allow_escape,
            allow_paste,
            secure,
            placeholder,
            force_digits,
            enable_navigation,
            length,
            styles,
            on_load,
            on_input,
            on_complete,
        } = options;

        self.auto_focus = auto_focus.unwrap_or(self.auto_focus);
        self.allow_escape = allow_escape.unwrap_or(self.allow_escape);
        self.allow_paste = allow_paste.unwrap_or(self.allow_paste);
        self.secure = secure.unwrap_or(self.secure);
        self.placeholder = placeholder.unwrap_or(self.placeholder);
        self.force_digits = force_digits.unwrap_or(self.force_digits);
        self.enable_navigation = enable_navigation.unwrap_or(self.enable_navigation);
        self.length = length.unwrap_or(self.length).max(1);
        if let Some(styles) = styles {
            self.styles.merge(&styles);
        }
        self.on_load = on_load.or(self.on_load);
        self.on_input = on_input.or(self.on_input);
        self.on_complete = on_complete.or(self.on_complete);
        self
    }

    /// Whether arrow keys and clicks move the active cell freely.
    pub fn navigation_active(&self) -> bool {
        self.enable_navigation && !self.secure
    }

    /// The glyph to mask with, when masking applies.
    pub fn mask(&self) -> Option<char> {
        self.secure.then_some(self.placeholder)
    }
}

/// Partial configuration. Every field left unset falls back to the
/// [`PincodeConfig`] default.
///
/// ```
/// use pincode::{PincodeConfig, PincodeOptions};
///
/// let config = PincodeConfig::default().merge(PincodeOptions::new().length(4).secure(true));
/// assert_eq!(config.length, 4);
/// assert!(config.secure);
/// assert!(config.force_digits);
/// ```
#[derive(Clone, Default)]
pub struct PincodeOptions {
    auto_focus: Option<bool>,
    allow_escape: Option<bool>,
    allow_paste: Option<bool>,
    secure: Option<bool>,
    placeholder: Option<char>,
    force_digits: Option<bool>,
    enable_navigation: Option<bool>,
    length: Option<usize>,
    styles: Option<StyleRules>,
    on_load: Option<OnLoad>,
    on_input: Option<OnInput>,
    on_complete: Option<OnComplete>,
}

impl fmt::Debug for PincodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PincodeOptions")
            .field("auto_focus", &self.auto_focus)
            .field("allow_escape", &self.allow_escape)
            .field("allow_paste", &self.allow_paste)
            .field("secure", &self.secure)
            .field("placeholder", &self.placeholder)
            .field("force_digits", &self.force_digits)
            .field("enable_navigation", &self.enable_navigation)
            .field("length", &self.length)
            .field("styles", &self.styles)
            .finish_non_exhaustive()
    }
}

impl PincodeOptions {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Focus cell 0 after mounting.
    pub fn auto_focus(mut self, on: bool) -> Self {
        self.auto_focus = Some(on);
        self
    }

    /// Let Escape clear and blur.
    pub fn allow_escape(mut self, on: bool) -> Self {
        self.allow_escape = Some(on);
        self
    }

    /// Accept pasted text.
    pub fn allow_paste(mut self, on: bool) -> Self {
        self.allow_paste = Some(on);
        self
    }

    /// Mask characters after a short reveal.
    pub fn secure(mut self, on: bool) -> Self {
        self.secure = Some(on);
        self
    }

    /// Glyph used for masking.
    pub fn placeholder(mut self, glyph: char) -> Self {
        self.placeholder = Some(glyph);
        self
    }

    /// Keep only ASCII digits.
    pub fn force_digits(mut self, on: bool) -> Self {
        self.force_digits = Some(on);
        self
    }

    /// Caret-driven navigation.
    pub fn enable_navigation(mut self, on: bool) -> Self {
        self.enable_navigation = Some(on);
        self
    }

    /// Cell count used when the input has no `maxlength`.
    pub fn length(mut self, cells: usize) -> Self {
        self.length = Some(cells);
        self
    }

    /// Style rules for the per-widget stylesheet.
    pub fn styles(mut self, rules: StyleRules) -> Self {
        self.styles = Some(rules);
        self
    }

    /// See [`OnLoad`].
    pub fn on_load(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_load = Some(Arc::new(f));
        self
    }

    /// See [`OnInput`].
    pub fn on_input(mut self, f: impl Fn(&str, Option<usize>) + Send + Sync + 'static) -> Self {
        self.on_input = Some(Arc::new(f));
        self
    }

    /// See [`OnComplete`].
    pub fn on_complete(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }
}
