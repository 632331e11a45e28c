//! Shared test support: a scripted adapter and schema builders.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cerulean::prelude::*;
use cerulean::{AdapterFuture, ExecutionResult};

/// Records every executed statement and replays scripted results in order.
///
/// When the script runs dry it answers with empty results, so render-only
/// assertions never need canned rows.
#[derive(Default)]
pub struct ScriptedAdapter {
    log: Mutex<Vec<Statement>>,
    script: Mutex<VecDeque<Outcome<ExecutionResult, Error>>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns: Vec<String> = columns.iter().map(ToString::to_string).collect();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(columns.clone(), values))
            .collect();
        self.script
            .lock()
            .unwrap()
            .push_back(Outcome::Ok(ExecutionResult::with_rows(columns, rows)));
    }

    pub fn push_result(&self, result: ExecutionResult) {
        self.script.lock().unwrap().push_back(Outcome::Ok(result));
    }

    pub fn push_error(&self, err: Error) {
        self.script.lock().unwrap().push_back(Outcome::Err(err));
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.log.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

impl Adapter for ScriptedAdapter {
    fn execute<'a>(&'a self, _cx: &'a Cx, statement: &'a Statement) -> AdapterFuture<'a> {
        Box::pin(async move {
            self.log.lock().unwrap().push(statement.clone());
            match self.script.lock().unwrap().pop_front() {
                Some(outcome) => outcome,
                None => Outcome::Ok(ExecutionResult::default()),
            }
        })
    }
}

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

/// Authors have many posts; posts belong to an author and have many
/// comments.
pub fn blog_schema() -> (Arc<ModelDef>, Arc<ModelDef>, Arc<ModelDef>) {
    let author = ModelDef::new("Author", "authors", "id");
    let post = ModelDef::new("Post", "posts", "id");
    let comment = ModelDef::new("Comment", "comments", "id");
    author
        .define_relations(vec![
            Arc::new(HasMany::new("posts", &author, &post)),
            Arc::new(Through::new("comments", &author, "posts", "comments")),
        ])
        .unwrap();
    post.define_relations(vec![
        Arc::new(BelongsTo::new("author", &post, &author)),
        Arc::new(HasMany::new("comments", &post, &comment)),
    ])
    .unwrap();
    comment
        .define_relations(vec![Arc::new(BelongsTo::new("author", &comment, &author))])
        .unwrap();
    (author, post, comment)
}

pub fn pg() -> Arc<dyn Grammar> {
    Arc::new(PostgresGrammar::default())
}
