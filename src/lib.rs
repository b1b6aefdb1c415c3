use suggest::SuggestionService;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod router;
pub mod store;
pub mod suggest;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub suggestions: SuggestionService,
}
