//! Todo list demo server.
//!
//! ```bash
//! cargo run --bin todo-api -- serve --config demos/todo_api.toml --log-format pretty
//! curl -X POST localhost:5000/todos -H 'content-type: application/json' -d '{"text":"milk"}'
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use brrtexpress::cli::{run_cli, Cli};
use brrtexpress::context::{RequestContext, ServiceCollection};
use brrtexpress::middleware::{SetHeaderMiddleware, TracingMiddleware};
use brrtexpress::Application;
use clap::Parser;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

const STORE_KEY: &str = "todos";

#[derive(Debug, Clone, Serialize)]
struct Todo {
    id: u64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct TodoInput {
    text: String,
}

#[derive(Default)]
struct TodoStore {
    next_id: AtomicU64,
    todos: DashMap<u64, Todo>,
}

impl TodoStore {
    fn list(&self) -> Vec<Todo> {
        let mut todos: Vec<Todo> = self.todos.iter().map(|t| t.value().clone()).collect();
        todos.sort_by_key(|t| t.id);
        todos
    }

    fn add(&self, text: String) -> Todo {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let todo = Todo { id, text };
        self.todos.insert(id, todo.clone());
        todo
    }

    fn update(&self, id: u64, text: String) -> Option<Todo> {
        let mut entry = self.todos.get_mut(&id)?;
        entry.text = text;
        Some(entry.clone())
    }

    fn remove(&self, id: u64) -> bool {
        self.todos.remove(&id).is_some()
    }
}

fn store(req: &RequestContext) -> anyhow::Result<Arc<TodoStore>> {
    req.service::<TodoStore>(STORE_KEY)
        .ok_or_else(|| anyhow!("todo store service is not registered"))
}

fn todo_id(req: &RequestContext) -> Option<u64> {
    req.param("id")?.parse().ok()
}

fn build_app() -> anyhow::Result<Application> {
    let mut services = ServiceCollection::new();
    services.add_singleton(STORE_KEY, TodoStore::default());

    let mut app = Application::new();
    app.use_middleware(TracingMiddleware)
        .use_middleware(SetHeaderMiddleware::new("X-Powered-By", "brrtexpress"))
        .enable_body_parsing()
        .with_services(Arc::new(services));

    // Shadowed by index.html when the static root is mounted at "/".
    app.get("/", |_req, res| {
        res.send("brrtexpress todo demo")?;
        Ok(())
    })?;

    app.get("/todos", |req, res| {
        res.status(200).json(&store(req)?.list())?;
        Ok(())
    })?;

    app.post("/todos", |req, res| {
        let Some(input) = req.body_as::<TodoInput>() else {
            res.status(400).json(&json!({ "error": "text is required" }))?;
            return Ok(());
        };
        let todo = store(req)?.add(input.text);
        res.status(201).json(&todo)?;
        Ok(())
    })?;

    app.put("/todos/:id", |req, res| {
        let (Some(id), Some(input)) = (todo_id(req), req.body_as::<TodoInput>()) else {
            res.status(400).json(&json!({ "error": "numeric id and text are required" }))?;
            return Ok(());
        };
        match store(req)?.update(id, input.text) {
            Some(todo) => res.json(&todo)?,
            None => res.status(404).send("Not found")?,
        }
        Ok(())
    })?;

    app.delete("/todos/:id", |req, res| {
        if let Some(id) = todo_id(req) {
            store(req)?.remove(id);
        }
        res.send_status(204)?;
        Ok(())
    })?;

    app.get("/hello", |_req, res| {
        res.send("Hello, world!")?;
        Ok(())
    })?;

    app.get("/redirect", |_req, res| {
        res.redirect("/todos")?;
        Ok(())
    })?;

    app.get("/query", |req, res| {
        res.json(req.query_map())?;
        Ok(())
    })?;

    app.get("/headers", |_req, res| {
        res.set_header("X-Test", "HeaderValue");
        res.send("Headers set!")?;
        Ok(())
    })?;

    Ok(app)
}

fn main() -> anyhow::Result<()> {
    run_cli(Cli::parse(), build_app)
}
