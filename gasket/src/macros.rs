/// Creates a single chat [`Message`](crate::Message) from a role shorthand.
///
/// ```rust
/// use gasket::{Role, gk_msg};
///
/// let message = gk_msg!(assistant => "Done.");
/// assert_eq!(message.role, Role::Assistant);
/// assert_eq!(message.text(), "Done.");
/// ```
#[macro_export]
macro_rules! gk_msg {
    (system => $content:expr $(,)?) => {
        $crate::Message::system($content)
    };
    (user => $content:expr $(,)?) => {
        $crate::Message::user($content)
    };
    (assistant => $content:expr $(,)?) => {
        $crate::Message::assistant($content)
    };
    ($role:ident => $content:expr $(,)?) => {
        compile_error!("unsupported role: use system, user, or assistant");
    };
}

/// Creates a `Vec<Message>` from role/content pairs.
///
/// ```rust
/// use gasket::{Role, gk_messages};
///
/// let messages = gk_messages![
///     system => "You are a vehicle diagnostics assistant.",
///     user => "Why is my check-engine light on?",
/// ];
///
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages[1].role, Role::User);
/// ```
#[macro_export]
macro_rules! gk_messages {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($role:ident => $content:expr),+ $(,)?) => {
        vec![$($crate::gk_msg!($role => $content)),+]
    };
}
