use std::sync::Arc;

use super::{Engine, KeywordDoc, LibraryInfo};
use crate::context::Context;

/// Keywords of one library, introspected once per process
pub fn lib_keywords(engine: &dyn Engine, ctx: &Context, library: &str) -> Arc<[KeywordDoc]> {
    if let Some(cached) = ctx.cached_keywords(library) {
        return cached;
    }

    let keywords = engine.library_keywords(library);
    tracing::debug!(library, count = keywords.len(), "cached library keywords");
    ctx.cache_keywords(library, keywords)
}

/// Keywords of every imported library, in library order
pub fn all_keywords(engine: &dyn Engine, ctx: &Context) -> Vec<KeywordDoc> {
    engine
        .libraries()
        .iter()
        .flat_map(|lib| lib_keywords(engine, ctx, &lib.name).to_vec())
        .collect()
}

/// Keywords whose name matches `name`, ignoring case
pub fn find_keyword(engine: &dyn Engine, ctx: &Context, name: &str) -> Vec<KeywordDoc> {
    let name = name.to_lowercase();
    all_keywords(engine, ctx)
        .into_iter()
        .filter(|keyword| keyword.name.to_lowercase() == name)
        .collect()
}

/// Names of imported libraries starting with `prefix`, ignoring case (all for "")
pub fn match_libs(engine: &dyn Engine, prefix: &str) -> Vec<String> {
    let names: Vec<String> = engine.libraries().into_iter().map(|lib| lib.name).collect();
    names_with_prefix(&names, prefix)
}

pub(crate) fn names_with_prefix(names: &[String], prefix: &str) -> Vec<String> {
    let prefix = prefix.to_lowercase();
    names
        .iter()
        .filter(|name| name.to_lowercase().starts_with(&prefix))
        .cloned()
        .collect()
}

pub fn find_library(engine: &dyn Engine, name: &str) -> Option<LibraryInfo> {
    engine.libraries().into_iter().find(|lib| lib.name == name)
}
