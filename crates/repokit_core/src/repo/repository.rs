//! Generic repository engine.
//!
//! # Responsibility
//! - Provide CRUD over any [`Entity`] through a [`Store`].
//! - Dispatch named derived, raw and bulk queries compiled once per name.
//!
//! # Invariants
//! - Compile-time failures surface before any store round-trip.
//! - The engine never begins or ends a transaction.
//! - Bulk updates never touch entity instances held by the caller.

use crate::model::meta::{Entity, ResolvedPath};
use crate::model::value::Value;
use crate::paging::{fetch_page, fetch_slice, Page, PageRequest, Slice};
use crate::projection::{ensure_arity, project, FromRow};
use crate::query::bulk::{compile_bulk, BulkPlan, BulkUpdate};
use crate::query::cache::PlanCache;
use crate::query::compile::{compile_descriptor, compile_raw};
use crate::query::descriptor::QueryDescriptor;
use crate::query::operator::Operator;
use crate::query::params::Params;
use crate::query::plan::{CompiledPlan, Predicate};
use crate::query::sort::Sort;
use crate::repo::error::{RepoError, RepoResult};
use crate::store::Store;
use log::{info, warn};
use std::marker::PhantomData;
use std::sync::Arc;

/// CRUD contract shared by every entity repository.
pub trait CrudRepository<E: Entity> {
    /// Inserts a transient entity (assigning its identity) or updates a
    /// persisted one. Returns the entity identity.
    fn save(&self, entity: &mut E) -> RepoResult<E::Id>;

    fn save_all(&self, entities: &mut [E]) -> RepoResult<Vec<E::Id>> {
        entities.iter_mut().map(|entity| self.save(entity)).collect()
    }

    /// Returns `None`, not an error, when no row matches.
    fn find_by_id(&self, id: E::Id) -> RepoResult<Option<E>>;

    fn exists_by_id(&self, id: E::Id) -> RepoResult<bool>;

    /// Full scan in store order.
    fn find_all(&self) -> RepoResult<Vec<E>>;

    fn find_all_sorted(&self, sort: &Sort) -> RepoResult<Vec<E>>;

    fn count(&self) -> RepoResult<u64>;

    /// Deleting a transient entity is a no-op.
    fn delete(&self, entity: &E) -> RepoResult<()>;

    fn delete_by_id(&self, id: E::Id) -> RepoResult<()>;
}

/// Repository engine for entity type `E` over store `S`.
///
/// Named plans live in shared caches so every repository built over the same
/// caches compiles a query name once.
pub struct Repository<'s, E, S: Store + ?Sized> {
    store: &'s S,
    by_id: CompiledPlan,
    all: CompiledPlan,
    plans: Arc<PlanCache<CompiledPlan>>,
    bulk_plans: Arc<PlanCache<BulkPlan>>,
    entity: PhantomData<fn() -> E>,
}

impl<'s, E: Entity, S: Store + ?Sized> Repository<'s, E, S> {
    /// Creates a repository with private plan caches.
    pub fn new(store: &'s S) -> Self {
        Self::with_caches(store, Arc::default(), Arc::default())
    }

    /// Creates a repository sharing plan caches with other repositories.
    pub fn with_caches(
        store: &'s S,
        plans: Arc<PlanCache<CompiledPlan>>,
        bulk_plans: Arc<PlanCache<BulkPlan>>,
    ) -> Self {
        let meta = E::meta();
        let identity = ResolvedPath {
            relation: None,
            attribute: &meta.id,
        };
        let by_id = CompiledPlan::derived(
            &format!("{}.findById", meta.name),
            meta,
            Some(Predicate::Compare {
                path: identity,
                operator: Operator::Equals,
                slot: 0,
            }),
            meta.row_paths(),
            Vec::new(),
            None,
            1,
        );
        let all = CompiledPlan::derived(
            &format!("{}.findAll", meta.name),
            meta,
            None,
            meta.row_paths(),
            Vec::new(),
            None,
            0,
        );
        Self {
            store,
            by_id,
            all,
            plans,
            bulk_plans,
            entity: PhantomData,
        }
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    /// Compiles and caches a derived query under `name`.
    ///
    /// # Contract
    /// - The first definition of a name wins; later definitions are ignored.
    pub fn define(&self, name: &str, descriptor: &QueryDescriptor) -> RepoResult<Arc<CompiledPlan>> {
        self.plans
            .get_or_try_insert(name, || compile_descriptor(name, E::meta(), descriptor))
    }

    /// Compiles and caches a raw SQL template under `name`.
    pub fn define_raw(&self, name: &str, template: &str) -> RepoResult<Arc<CompiledPlan>> {
        self.plans
            .get_or_try_insert(name, || compile_raw(name, E::meta(), template))
    }

    /// Compiles and caches a bulk update under `name`.
    pub fn define_bulk(&self, name: &str, update: &BulkUpdate) -> RepoResult<Arc<BulkPlan>> {
        self.bulk_plans
            .get_or_try_insert(name, || compile_bulk(name, E::meta(), update))
    }

    fn plan(&self, name: &str) -> RepoResult<Arc<CompiledPlan>> {
        self.plans
            .get(name)
            .ok_or_else(|| RepoError::UnknownQuery(name.to_string()))
    }

    /// Runs the named query and maps every row into `T`.
    pub fn find_many<T: FromRow>(&self, name: &str, params: &Params) -> RepoResult<Vec<T>> {
        let plan = self.plan(name)?;
        self.fetch(&plan, params)
    }

    /// Runs the named query expecting at most one row.
    ///
    /// # Contract
    /// - Zero rows returns `Ok(None)`.
    /// - More than one row fails with `NonUniqueResult`; no row is picked.
    pub fn find_one<T: FromRow>(&self, name: &str, params: &Params) -> RepoResult<Option<T>> {
        let plan = self.plan(name)?;
        let first_two = plan.with_window(Some(2), 0);
        let mut rows: Vec<T> = self.fetch(&first_two, params)?;
        if rows.len() > 1 {
            warn!(
                "event=non_unique_result module=repo status=error plan={name} entity={}",
                E::meta().name
            );
            return Err(RepoError::NonUniqueResult {
                query: name.to_string(),
            });
        }
        Ok(rows.pop())
    }

    /// Runs the named query as a counted page.
    pub fn page<T: FromRow>(
        &self,
        name: &str,
        params: &Params,
        request: &PageRequest,
    ) -> RepoResult<Page<T>> {
        let plan = self.plan(name)?;
        fetch_page(self.store, &plan, params, request)
    }

    /// Runs the named query as an uncounted slice.
    pub fn slice<T: FromRow>(
        &self,
        name: &str,
        params: &Params,
        request: &PageRequest,
    ) -> RepoResult<Slice<T>> {
        let plan = self.plan(name)?;
        fetch_slice(self.store, &plan, params, request)
    }

    pub fn find_all_page(&self, request: &PageRequest) -> RepoResult<Page<E>> {
        fetch_page(self.store, &self.all, &Params::none(), request)
    }

    /// Runs the named bulk update and returns the affected row count.
    ///
    /// # Contract
    /// - Entities fetched earlier keep their old state; use [`Self::refresh`].
    /// - Zero affected rows is a valid result.
    pub fn bulk_update(&self, name: &str, params: &Params) -> RepoResult<usize> {
        let plan = self
            .bulk_plans
            .get(name)
            .ok_or_else(|| RepoError::UnknownQuery(name.to_string()))?;
        let values = plan.bind(params)?;
        let affected = self.store.bulk_update(&plan, values)?;
        info!(
            "event=bulk_update module=repo status=ok plan={name} entity={} rows={affected}",
            E::meta().name
        );
        Ok(affected)
    }

    /// Reloads a persisted entity from the store in place.
    pub fn refresh(&self, entity: &mut E) -> RepoResult<()> {
        let id = entity.id().ok_or_else(|| {
            RepoError::InvalidQuery(format!(
                "cannot refresh a transient {}",
                E::meta().name
            ))
        })?;
        *entity = self
            .find_by_id(id)?
            .ok_or_else(|| self.not_found(id))?;
        Ok(())
    }

    fn fetch<T: FromRow>(&self, plan: &CompiledPlan, params: &Params) -> RepoResult<Vec<T>> {
        let values = plan.bind(params)?;
        if let Some(width) = plan.column_count() {
            ensure_arity::<T>(width)?;
        }
        project(self.store.fetch(plan, values)?)
    }

    fn not_found(&self, id: E::Id) -> RepoError {
        RepoError::NotFound {
            entity: E::meta().name,
            id: id.into(),
        }
    }
}

impl<E: Entity, S: Store + ?Sized> CrudRepository<E> for Repository<'_, E, S> {
    fn save(&self, entity: &mut E) -> RepoResult<E::Id> {
        let meta = E::meta();
        match entity.id() {
            Some(id) => {
                let changed = self.store.update(meta, id.into(), entity.column_values())?;
                if changed == 0 {
                    return Err(self.not_found(id));
                }
                Ok(id)
            }
            None => {
                let id = E::Id::from(self.store.insert(meta, entity.column_values())?);
                entity.assign_id(id);
                Ok(id)
            }
        }
    }

    fn find_by_id(&self, id: E::Id) -> RepoResult<Option<E>> {
        let rows = self.fetch(&self.by_id, &Params::Positional(vec![Value::Integer(id.into())]))?;
        Ok(rows.into_iter().next())
    }

    fn exists_by_id(&self, id: E::Id) -> RepoResult<bool> {
        let total = self
            .store
            .count(&self.by_id, vec![Value::Integer(id.into())])?;
        Ok(total > 0)
    }

    fn find_all(&self) -> RepoResult<Vec<E>> {
        self.fetch(&self.all, &Params::none())
    }

    fn find_all_sorted(&self, sort: &Sort) -> RepoResult<Vec<E>> {
        self.fetch(&self.all.with_sort(sort)?, &Params::none())
    }

    fn count(&self) -> RepoResult<u64> {
        self.store.count(&self.all, Vec::new())
    }

    fn delete(&self, entity: &E) -> RepoResult<()> {
        match entity.id() {
            Some(id) => self.delete_by_id(id),
            None => Ok(()),
        }
    }

    fn delete_by_id(&self, id: E::Id) -> RepoResult<()> {
        let changed = self.store.delete(E::meta(), id.into())?;
        if changed == 0 {
            return Err(self.not_found(id));
        }
        Ok(())
    }
}
