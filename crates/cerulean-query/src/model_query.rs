//! Model-bound queries: association joins and eager loading.

use std::collections::HashMap;
use std::sync::Arc;

use asupersync::{Cx, Outcome};
use cerulean_core::{Adapter, Error, Result, Statement};
use cerulean_dialect::{Condition, Grammar, JoinClause, JoinKind, OrderBy};
use cerulean_model::{Entity, EntityRef, ModelDef, Relation};
use tracing::debug;

use crate::query::Query;

/// A query over one model, producing shared entity handles.
///
/// Extends the core query with association-path joins (dotted paths
/// resolved against the relation graph, with deterministic `_jN` aliases
/// for repeated tables) and `with()` eager loading (one batched prefetch
/// statement per direct hop after the primary statement).
pub struct ModelQuery {
    model: Arc<ModelDef>,
    query: Query,
    /// Association path -> alias the joined table is known by
    joined: HashMap<String, String>,
    /// Table name -> number of times it appears in the FROM/JOIN list
    alias_counts: HashMap<String, usize>,
    eager: Vec<String>,
}

impl ModelQuery {
    /// A query over `model` rendered by `grammar`.
    pub fn new(model: &Arc<ModelDef>, grammar: Arc<dyn Grammar>) -> Self {
        let query = Query::from_table(model.table()).grammar(grammar);
        let mut alias_counts = HashMap::new();
        alias_counts.insert(model.table().to_string(), 1);
        Self {
            model: Arc::clone(model),
            query,
            joined: HashMap::new(),
            alias_counts,
            eager: Vec::new(),
        }
    }

    /// New query with this one's definition and a fresh result slot.
    ///
    /// The joined-relations map is copied, never shared.
    fn derive(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            query: self.query.duplicate(),
            joined: self.joined.clone(),
            alias_counts: self.alias_counts.clone(),
            eager: self.eager.clone(),
        }
    }

    /// Explicit clone-with-reset.
    pub fn duplicate(&self) -> Self {
        self.derive()
    }

    /// The model this query hydrates.
    pub fn model(&self) -> &Arc<ModelDef> {
        &self.model
    }

    /// Add a filter condition, merged under AND.
    #[must_use]
    pub fn filter(&self, condition: Condition) -> Self {
        let mut next = self.derive();
        next.query = next.query.filter(condition);
        next
    }

    /// Append an ORDER BY term.
    #[must_use]
    pub fn order_by(&self, order: OrderBy) -> Self {
        let mut next = self.derive();
        next.query = next.query.order_by(order);
        next
    }

    /// Cap the number of rows.
    #[must_use]
    pub fn limit(&self, limit: u64) -> Self {
        let mut next = self.derive();
        next.query = next.query.limit(limit);
        next
    }

    /// Skip leading rows.
    #[must_use]
    pub fn offset(&self, offset: u64) -> Self {
        let mut next = self.derive();
        next.query = next.query.offset(offset);
        next
    }

    /// Register a hook fired with the rendered statement before execution.
    #[must_use]
    pub fn on_execute(
        &self,
        hook: impl Fn(&Statement) + Send + Sync + 'static,
    ) -> Self {
        let mut next = self.derive();
        next.query = next.query.on_execute(hook);
        next
    }

    /// Join an association path, e.g. `"author"` or `"comments.author"`.
    ///
    /// Each segment resolves against the model reached by the previous
    /// segment; composed relations expand into one join per hop. A path
    /// joins at most once: repeats reuse the recorded alias. The single
    /// string argument always names an association; use
    /// [`ModelQuery::join_table`] to join a physical table directly.
    pub fn join(&self, path: &str) -> Result<Self> {
        let mut next = self.derive();
        next.ensure_joined(path)?;
        Ok(next)
    }

    /// Join a physical table with an explicit ON condition.
    #[must_use]
    pub fn join_table(&self, table: &str, kind: JoinKind, on: Condition) -> Self {
        let mut next = self.derive();
        *next.alias_counts.entry(table.to_string()).or_insert(0) += 1;
        next.query = next.query.join_clause(JoinClause::new(table, kind, on));
        next
    }

    /// Register an association path for eager loading.
    ///
    /// After the primary statement, each hop runs one batched prefetch
    /// over the owning set and wires the results without dirtying any
    /// entity.
    #[must_use]
    pub fn with(&self, path: &str) -> Self {
        let mut next = self.derive();
        if !next.eager.iter().any(|existing| existing == path) {
            next.eager.push(path.to_string());
        }
        next
    }

    /// Render the primary statement.
    pub fn statement(&self) -> Result<Statement> {
        self.query.statement()
    }

    /// Execute and hydrate all matching entities, then run eager loads.
    pub async fn all(&self, cx: &Cx, adapter: &dyn Adapter) -> Outcome<Vec<EntityRef>, Error> {
        let result = match self.query.execute(cx, adapter).await {
            Outcome::Ok(result) => result,
            Outcome::Err(err) => return Outcome::Err(err),
            Outcome::Cancelled(reason) => return Outcome::Cancelled(reason),
            Outcome::Panicked(payload) => return Outcome::Panicked(payload),
        };
        let entities: Vec<EntityRef> = result
            .rows
            .iter()
            .map(|row| Entity::from_row(Arc::clone(&self.model), row).into_ref())
            .collect();
        debug!(model = %self.model.name(), count = entities.len(), "hydrated entities");

        for path in &self.eager {
            match self.eager_load(cx, adapter, path, &entities).await {
                Outcome::Ok(()) => {}
                Outcome::Err(err) => return Outcome::Err(err),
                Outcome::Cancelled(reason) => return Outcome::Cancelled(reason),
                Outcome::Panicked(payload) => return Outcome::Panicked(payload),
            }
        }
        Outcome::Ok(entities)
    }

    /// Execute with `LIMIT 1` and return the first entity, if any.
    pub async fn first(
        &self,
        cx: &Cx,
        adapter: &dyn Adapter,
    ) -> Outcome<Option<EntityRef>, Error> {
        match self.limit(1).all(cx, adapter).await {
            Outcome::Ok(entities) => Outcome::Ok(entities.into_iter().next()),
            Outcome::Err(err) => Outcome::Err(err),
            Outcome::Cancelled(reason) => Outcome::Cancelled(reason),
            Outcome::Panicked(payload) => Outcome::Panicked(payload),
        }
    }

    /// Execute and require exactly one matching entity.
    pub async fn one(&self, cx: &Cx, adapter: &dyn Adapter) -> Outcome<EntityRef, Error> {
        match self.all(cx, adapter).await {
            Outcome::Ok(mut entities) => match entities.len() {
                1 => match entities.pop() {
                    Some(entity) => Outcome::Ok(entity),
                    None => Outcome::Err(Error::Custom(
                        "expected exactly one result, found none".to_string(),
                    )),
                },
                0 => Outcome::Err(Error::Custom(format!(
                    "expected exactly one '{}', found none",
                    self.model.name()
                ))),
                n => Outcome::Err(Error::Custom(format!(
                    "expected exactly one '{}', found {n}",
                    self.model.name()
                ))),
            },
            Outcome::Err(err) => Outcome::Err(err),
            Outcome::Cancelled(reason) => Outcome::Cancelled(reason),
            Outcome::Panicked(payload) => Outcome::Panicked(payload),
        }
    }

    /// Walk one eager path: prefetch each hop over the accumulated
    /// entity set, wiring results as it goes.
    async fn eager_load(
        &self,
        cx: &Cx,
        adapter: &dyn Adapter,
        path: &str,
        owners: &[EntityRef],
    ) -> Outcome<(), Error> {
        let Some(grammar) = self.query.bound_grammar() else {
            return Outcome::Err(Error::Unrenderable);
        };
        let mut model = Arc::clone(&self.model);
        let mut current: Vec<EntityRef> = owners.to_vec();
        for segment in path.split('.') {
            let Some(relation) = model.relation(segment) else {
                return Outcome::Err(Error::Custom(format!(
                    "model '{}' has no relation '{}'",
                    model.name(),
                    segment
                )));
            };
            let result = match relation
                .prefetch(cx, adapter, grammar.as_ref(), &current)
                .await
            {
                Outcome::Ok(result) => result,
                Outcome::Err(err) => return Outcome::Err(err),
                Outcome::Cancelled(reason) => return Outcome::Cancelled(reason),
                Outcome::Panicked(payload) => return Outcome::Panicked(payload),
            };
            if let Err(err) = relation.associate_prefetch_results(&current, &result) {
                return Outcome::Err(err);
            }
            current = result.entities().cloned().collect();
            model = Arc::clone(relation.related());
        }
        Outcome::Ok(())
    }

    /// Resolve an association path into join clauses, reusing any alias
    /// already recorded for a prefix of the path.
    fn ensure_joined(&mut self, path: &str) -> Result<String> {
        let mut model = Arc::clone(&self.model);
        let mut base = self.model.table().to_string();
        let mut prefix = String::new();
        for segment in path.split('.') {
            let full = if prefix.is_empty() {
                segment.to_string()
            } else {
                format!("{prefix}.{segment}")
            };
            let relation = model.relation(segment).ok_or_else(|| {
                Error::Custom(format!(
                    "model '{}' has no relation '{}'",
                    model.name(),
                    segment
                ))
            })?;
            if let Some(alias) = self.joined.get(&full) {
                base = alias.clone();
            } else {
                let hops = relation.expand()?;
                let chain: Vec<Arc<dyn Relation>> = if hops.is_empty() {
                    vec![Arc::clone(&relation)]
                } else {
                    hops
                };
                for hop in &chain {
                    let table = hop.related().table().to_string();
                    let (alias, reference) = self.alias_for(&table);
                    let on = hop.join_condition(&base, &reference)?;
                    let mut clause = JoinClause::new(table, JoinKind::Inner, on);
                    if let Some(alias) = alias {
                        clause = clause.with_alias(alias);
                    }
                    self.query = self.query.join_clause(clause);
                    base = reference;
                }
                self.joined.insert(full.clone(), base.clone());
            }
            model = Arc::clone(relation.related());
            prefix = full;
        }
        Ok(base)
    }

    /// Reference name for the next join of `table`: the bare table name
    /// on first use, `{table}_jN` on repeats.
    fn alias_for(&mut self, table: &str) -> (Option<String>, String) {
        let count = self.alias_counts.entry(table.to_string()).or_insert(0);
        let out = if *count == 0 {
            (None, table.to_string())
        } else {
            let alias = format!("{table}_j{count}");
            (Some(alias.clone()), alias)
        };
        *count += 1;
        out
    }
}
