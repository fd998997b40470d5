use proc_macro::TokenStream;

mod assets;

/// Embeds every file matching a glob (relative to the calling crate's
/// manifest directory) and registers it in the embedded template store
/// before `main` runs. Templates are named by their path relative to the
/// non-glob prefix of the pattern.
///
/// ```ignore
/// webtpl::template_assets!("templates/**/*.html");
/// ```
#[proc_macro]
pub fn template_assets(input: TokenStream) -> TokenStream {
    assets::template_assets_impl(input)
}
