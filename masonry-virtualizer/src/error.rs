use alloc::string::String;

/// Rejected engine configuration.
///
/// These are caller bugs and are reported once, when options are applied, instead of surfacing
/// later as a division by zero deep inside the layout math.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_item_width must be greater than zero")]
    ZeroMaxItemWidth,
    #[error("max_columns must be greater than zero when set")]
    ZeroMaxColumns,
}

/// A renderer could not report a natural height for an item.
///
/// The engine never propagates this: the item is placed with the configured fallback height.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MeasureError {
    #[error("renderer failed to measure item: {0}")]
    Render(String),
    #[error("renderer went away before reporting a height")]
    Disconnected,
}

impl MeasureError {
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }
}
