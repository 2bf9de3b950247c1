//! Client side of a survey platform: typed questions and answers, the
//! response codec, analytics view models, and facades over the REST backend.

pub mod error;
pub mod state;

pub mod survey {
    pub mod codec;
    pub mod registry;
    pub mod types;
}

pub mod analytics {
    pub mod feedback;
    pub mod types;
    pub mod view_model;
}

pub mod client {
    pub mod auth;
    pub mod config;
    pub mod http;
    pub mod surveys;
    pub mod token;
    pub mod types;
}

pub mod commands {
    pub mod analytics;
    pub mod dashboard;
    pub mod respond;
    pub mod session;
}

pub mod util {
    pub mod text;
}
