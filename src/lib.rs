pub mod checklist;
pub mod cli {
    pub mod parser;
}
pub mod config;
pub mod error;
pub mod jira {
    pub mod client;
    pub mod issues;
    pub mod sync;
    pub mod transitions;
}
pub mod locate;
pub mod markdown_parser;
pub mod output;
pub mod run;
pub mod whoami;
