use glob::glob;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use std::collections::hash_map::DefaultHasher;
use std::env;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use syn::{LitStr, parse_macro_input};

pub fn template_assets_impl(input: TokenStream) -> TokenStream {
    // glob relative to the calling crate's manifest directory
    let pattern = parse_macro_input!(input as LitStr);
    let pattern_str = pattern.value();

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => dir,
        Err(_) => {
            return syn::Error::new(pattern.span(), "CARGO_MANIFEST_DIR is not set")
                .to_compile_error()
                .into();
        }
    };
    let root = PathBuf::from(manifest_dir);
    let base = root.join(glob_base(&pattern_str));
    let full_pattern = root.join(&pattern_str);

    let mut files: Vec<PathBuf> = match glob(&full_pattern.to_string_lossy()) {
        Ok(paths) => paths
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => {
            return syn::Error::new(pattern.span(), format!("invalid glob pattern: {}", e))
                .to_compile_error()
                .into();
        }
    };
    files.sort();

    // names are `/`-separated paths relative to the glob base
    let assets: Vec<_> = files
        .iter()
        .map(|path| {
            let name = template_name(&base, path);
            let file = path.to_string_lossy().to_string();
            quote! {
                (#name, include_str!(#file))
            }
        })
        .collect();

    // one registration fn per pattern
    let mut hasher = DefaultHasher::new();
    pattern_str.hash(&mut hasher);
    let fn_name = format_ident!("__webtpl_register_templates_{}", hasher.finish());

    let output = quote! {
        #[::webtpl::ctor::ctor]
        fn #fn_name() {
            let assets = vec![
                #(#assets),*
            ];
            let _ = ::webtpl::store::load_assets(assets);
        }
    };

    output.into()
}

/// Leading components of `pattern` that contain no glob syntax.
fn glob_base(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|c| {
            let part = c.as_os_str().to_string_lossy();
            !part.contains(['*', '?', '[', '{'])
        })
        .collect()
}

fn template_name(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    parts.join("/")
}
