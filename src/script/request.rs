/// `crossorigin` attribute values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CrossOrigin {
    Anonymous,
    UseCredentials,
}

impl CrossOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            CrossOrigin::Anonymous => "anonymous",
            CrossOrigin::UseCredentials => "use-credentials",
        }
    }
}

/// Describes the `<script>` element to inject.
///
/// Two requests that compare equal resolve to the same element; the loader uses this to
/// decide whether a re-acquisition must tear down the existing node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScriptRequest {
    src: String,
    debug_src: Option<String>,
    debug: bool,
    nonce: Option<String>,
    is_async: bool,
    defer: bool,
    cross_origin: Option<CrossOrigin>,
}

impl ScriptRequest {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            debug_src: None,
            debug: false,
            nonce: None,
            is_async: false,
            defer: false,
            cross_origin: None,
        }
    }

    /// Alternate URL used instead of `src` when [`Self::with_debug`] is enabled.
    pub fn with_debug_src(mut self, src: impl Into<String>) -> Self {
        self.debug_src = Some(src.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_async(mut self, value: bool) -> Self {
        self.is_async = value;
        self
    }

    pub fn with_defer(mut self, value: bool) -> Self {
        self.defer = value;
        self
    }

    pub fn with_cross_origin(mut self, value: CrossOrigin) -> Self {
        self.cross_origin = Some(value);
        self
    }

    /// The URL that will actually be fetched.
    pub fn src(&self) -> &str {
        match (&self.debug_src, self.debug) {
            (Some(debug_src), true) => debug_src,
            _ => &self.src,
        }
    }

    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn defer(&self) -> bool {
        self.defer
    }

    pub fn cross_origin(&self) -> Option<CrossOrigin> {
        self.cross_origin
    }
}
