use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod command_enum;

/// Makes a unit-only enum selectable by name as a command argument
///
/// Generates:
/// - `CommandEnum` impl naming each variant by its lowercased identifier,
///   with the first doc comment line as description
/// - `FromStr` impl with case-insensitive matching
/// - `Display` impl printing the variant name
///
/// # Example
/// ```ignore
/// #[command_enum]
/// #[derive(Clone, Debug, PartialEq)]
/// enum GameMode {
///     /// Regular play
///     Survival,
///     Creative,
/// }
/// ```
#[proc_macro_attribute]
pub fn command_enum(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    command_enum::impl_command_enum(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
