use chrono::{DateTime, FixedOffset};

/// The message sent when pressure is falling fast. Shown in the user's
/// language; `{pressure}` is the current reading in hPa.
pub const DEFAULT_TEMPLATE: &str =
    "気圧が急激に下がっています👇\n天気と頭痛に気をつけてね😉\n気圧:{pressure}hPa";

/// Values available to a message template.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext {
    pub current_hpa: f64,
    pub historical_hpa: f64,
    pub delta_hpa: f64,
    /// Time of the decision, in the deployment's local offset.
    pub timestamp: DateTime<FixedOffset>,
}

/// Fills the placeholders of `template`.
///
/// Supported placeholders: `{pressure}`, `{historical}` and `{delta}` (hPa,
/// one decimal place; `{delta}` is signed) and `{timestamp}` (RFC 3339).
///
/// # Examples
///
/// ```
/// use baromon_notify::message::{render_message, MessageContext};
/// use chrono::{FixedOffset, TimeZone};
///
/// let ctx = MessageContext {
///     current_hpa: 1011.46,
///     historical_hpa: 1013.0,
///     delta_hpa: -1.54,
///     timestamp: FixedOffset::east_opt(9 * 3600)
///         .unwrap()
///         .with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
///         .unwrap(),
/// };
/// assert_eq!(render_message("now {pressure} ({delta})", &ctx), "now 1011.5 (-1.5)");
/// ```
pub fn render_message(template: &str, ctx: &MessageContext) -> String {
    template
        .replace("{pressure}", &format!("{:.1}", ctx.current_hpa))
        .replace("{historical}", &format!("{:.1}", ctx.historical_hpa))
        .replace("{delta}", &format!("{:+.1}", ctx.delta_hpa))
        .replace("{timestamp}", &ctx.timestamp.to_rfc3339())
}
