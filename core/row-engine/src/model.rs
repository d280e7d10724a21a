//! FILENAME: core/row-engine/src/model.rs
//! Row model orchestrator - drives the stage pipeline and serves queries.
//!
//! All mutations funnel through `refresh_model`: the caller names the
//! first step that needs to run and every later step follows in the
//! fixed order Everything, Filter, Pivot, Aggregate, Sort, Map. A
//! sort-model change therefore skips regrouping and refiltering, while a
//! data change cascades through the lot. The final Map step always
//! rebuilds the display list from scratch, so pixel offsets are never
//! stale no matter which subtrees changed. Each run ends with a single
//! model-updated event.

use std::time::{Duration, Instant};

use grid_model::{
    ChildList, EventBus, GridEvent, RowCallbacks, RowDataTransaction, RowId, RowNode,
    RowNodeManager, SelectionState, TransactionApplied, TransactionResult,
};
use log::debug;
use rustc_hash::FxHashMap;

use crate::changed_path::ChangedPath;
use crate::criteria::{ColumnFilterModel, FilterCriteria};
use crate::definition::{RowModelConfig, SortModel, SortModelItem};
use crate::display::DisplayedRows;
use crate::field::{FieldRegistry, FieldValue};
use crate::filter::{run_filter, CriteriaEvaluator, FilterEvaluator};
use crate::flatten::{run_flatten, RowHeightCallback};
use crate::sort::{run_sort, ComparatorRegistry};
use crate::stage::{passthrough_group, RowNodeStage};

// ============================================================================
// REFRESH STEPS
// ============================================================================

/// Pipeline steps in execution order. Refreshing from a step runs that
/// step and everything after it, never anything before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStep {
    Everything,
    Filter,
    Pivot,
    Aggregate,
    Sort,
    Map,
}

pub const STEP_ORDER: [RefreshStep; 6] = [
    RefreshStep::Everything,
    RefreshStep::Filter,
    RefreshStep::Pivot,
    RefreshStep::Aggregate,
    RefreshStep::Sort,
    RefreshStep::Map,
];

impl RefreshStep {
    /// Index of this step in [`STEP_ORDER`].
    pub fn position(self) -> usize {
        STEP_ORDER.iter().position(|&step| step == self).unwrap_or(0)
    }
}

/// How a refresh run should behave and what the model-updated event
/// reports about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshParams {
    /// First step to execute.
    pub step: RefreshStep,
    /// Renderer should animate row movement.
    pub animate: bool,
    /// Rendered rows can be patched in place instead of redrawn.
    pub keep_rendered_rows: bool,
    /// The run was caused by a full data replacement.
    pub new_data: bool,
}

impl Default for RefreshParams {
    fn default() -> Self {
        RefreshParams {
            step: RefreshStep::Everything,
            animate: false,
            keep_rendered_rows: false,
            new_data: false,
        }
    }
}

impl RefreshParams {
    pub fn from_step(step: RefreshStep) -> Self {
        RefreshParams {
            step,
            ..Default::default()
        }
    }
}

// ============================================================================
// ASYNC TRANSACTION QUEUE
// ============================================================================

/// Completion callback for one async transaction; receives only that
/// transaction's own result.
pub type TransactionCallback<T> = Box<dyn FnOnce(&TransactionResult<T>)>;

struct PendingTransaction<T> {
    tx: RowDataTransaction<T>,
    callback: Option<TransactionCallback<T>>,
}

// ============================================================================
// ROW MODEL
// ============================================================================

pub struct RowModel<T> {
    manager: RowNodeManager<T>,
    config: RowModelConfig,
    fields: FieldRegistry<T>,
    comparators: ComparatorRegistry<T>,
    filter_model: ColumnFilterModel,
    /// Installed predicate collaborator; overrides the built-in criteria
    /// evaluator when present.
    custom_evaluator: Option<Box<dyn FilterEvaluator<T>>>,
    sort_model: SortModel,
    /// Manual id-to-position order, e.g. from a drag reorder. Overrides
    /// comparator sorting for leaf arrays until cleared or superseded by
    /// a new sort model.
    row_node_order: Option<FxHashMap<RowId, usize>>,
    group_stage: Option<Box<dyn RowNodeStage<T>>>,
    pivot_stage: Option<Box<dyn RowNodeStage<T>>>,
    aggregation_stage: Option<Box<dyn RowNodeStage<T>>>,
    row_height_callback: Option<RowHeightCallback<T>>,
    events: EventBus,
    displayed: DisplayedRows,
    async_queue: Vec<PendingTransaction<T>>,
    /// Wall-clock moment the queued transactions fall due. Set when the
    /// first transaction enters an empty queue; the host's scheduler
    /// checks it and calls `flush_async_transactions`.
    async_deadline: Option<Instant>,
}

impl<T> RowModel<T> {
    pub fn new(config: RowModelConfig, callbacks: RowCallbacks<T>) -> Self {
        let mut manager = RowNodeManager::new(callbacks);
        manager.set_group_default_expanded(config.group_default_expanded);
        RowModel {
            manager,
            config,
            fields: FieldRegistry::new(),
            comparators: ComparatorRegistry::new(),
            filter_model: ColumnFilterModel::new(),
            custom_evaluator: None,
            sort_model: Vec::new(),
            row_node_order: None,
            group_stage: None,
            pivot_stage: None,
            aggregation_stage: None,
            row_height_callback: None,
            events: EventBus::new(),
            displayed: DisplayedRows::new(),
            async_queue: Vec::new(),
            async_deadline: None,
        }
    }

    pub fn with_defaults(callbacks: RowCallbacks<T>) -> Self {
        Self::new(RowModelConfig::default(), callbacks)
    }

    pub fn config(&self) -> &RowModelConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    // ========================================================================
    // REGISTRATION
    // ========================================================================

    /// Registers a column getter. Takes effect on the next refresh.
    pub fn register_field(
        &mut self,
        col_id: impl Into<String>,
        getter: impl Fn(&T) -> FieldValue + 'static,
    ) {
        self.fields.register(col_id, getter);
    }

    /// Registers a custom sort comparator for a column. Takes effect on
    /// the next refresh.
    pub fn register_comparator(
        &mut self,
        col_id: impl Into<String>,
        comparator: impl Fn(&RowNode<T>, &RowNode<T>) -> std::cmp::Ordering + 'static,
    ) {
        self.comparators.register(col_id, comparator);
    }

    // ========================================================================
    // ROW DATA
    // ========================================================================

    /// Replaces the whole data set and reruns the full pipeline. Queued
    /// async transactions are discarded; they were written against data
    /// that no longer exists.
    pub fn set_row_data(&mut self, rows: Vec<T>) {
        if !self.async_queue.is_empty() {
            debug!(
                "discarding {} queued async transactions on full data replacement",
                self.async_queue.len()
            );
            self.async_queue.clear();
        }
        self.async_deadline = None;

        self.manager.set_row_data(rows);
        self.events.publish(&GridEvent::RowDataChanged {
            row_count: self.manager.leaf_count(),
        });
        self.refresh_model(RefreshParams {
            step: RefreshStep::Everything,
            animate: false,
            keep_rendered_rows: false,
            new_data: true,
        });
    }

    /// Applies one delta update synchronously. Returns `None` (and leaves
    /// the model untouched) in legacy tree mode.
    pub fn apply_transaction(&mut self, tx: RowDataTransaction<T>) -> Option<TransactionResult<T>> {
        let applied = self.manager.apply_transaction(tx)?;
        let path = self.build_changed_path(&applied);
        self.refresh_with_path(
            RefreshParams {
                step: RefreshStep::Everything,
                animate: true,
                keep_rendered_rows: true,
                new_data: false,
            },
            Some(path),
        );
        if !applied.deselected.is_empty() {
            self.events.publish(&GridEvent::SelectionChanged {
                row_ids: applied.deselected.clone(),
            });
        }
        Some(applied.result)
    }

    /// Queues a transaction for the next flush. The wait window opens
    /// when the first transaction enters an empty queue; the host is
    /// expected to call [`flush_async_transactions`](Self::flush_async_transactions)
    /// once [`async_flush_due`](Self::async_flush_due) reports true.
    pub fn apply_transaction_async(
        &mut self,
        tx: RowDataTransaction<T>,
        callback: Option<TransactionCallback<T>>,
    ) {
        if self.async_queue.is_empty() {
            self.async_deadline = Some(
                Instant::now() + Duration::from_millis(self.config.async_transaction_wait_millis),
            );
        }
        self.async_queue.push(PendingTransaction { tx, callback });
    }

    /// Applies every queued transaction in submission order inside one
    /// pipeline run, then invokes the callbacks in the same order, each
    /// with its own result. Returns the number of transactions taken off
    /// the queue.
    pub fn flush_async_transactions(&mut self) -> usize {
        let pending = std::mem::take(&mut self.async_queue);
        self.async_deadline = None;
        if pending.is_empty() {
            return 0;
        }
        let count = pending.len();
        debug!("flushing {} async transactions", count);

        let mut path = ChangedPath::new(self.manager.tree().root_key());
        let mut deselected: Vec<RowId> = Vec::new();
        let mut completions: Vec<(Option<TransactionCallback<T>>, Option<TransactionResult<T>>)> =
            Vec::with_capacity(count);

        for PendingTransaction { tx, callback } in pending {
            match self.manager.apply_transaction(tx) {
                Some(applied) => {
                    let tree = self.manager.tree();
                    for &key in applied.changed_keys.iter().chain(&applied.removed_parents) {
                        path.add_parent_chain(tree, key);
                    }
                    deselected.extend(applied.deselected);
                    completions.push((callback, Some(applied.result)));
                }
                // Rejected transactions get no callback invocation.
                None => completions.push((callback, None)),
            }
        }

        self.refresh_with_path(
            RefreshParams {
                step: RefreshStep::Everything,
                animate: true,
                keep_rendered_rows: true,
                new_data: false,
            },
            Some(path),
        );

        if !deselected.is_empty() {
            self.events
                .publish(&GridEvent::SelectionChanged { row_ids: deselected });
        }
        for (callback, result) in completions {
            if let (Some(callback), Some(result)) = (callback, result) {
                callback(&result);
            }
        }
        self.events.publish(&GridEvent::AsyncTransactionsFlushed {
            transaction_count: count,
        });
        count
    }

    pub fn has_pending_async_transactions(&self) -> bool {
        !self.async_queue.is_empty()
    }

    pub fn async_flush_deadline(&self) -> Option<Instant> {
        self.async_deadline
    }

    /// Whether the wait window has elapsed and the queue should flush.
    pub fn async_flush_due(&self, now: Instant) -> bool {
        self.async_deadline.map(|deadline| now >= deadline).unwrap_or(false)
    }

    fn build_changed_path(&self, applied: &TransactionApplied<T>) -> ChangedPath {
        let tree = self.manager.tree();
        let mut path = ChangedPath::new(tree.root_key());
        for &key in applied.changed_keys.iter().chain(&applied.removed_parents) {
            path.add_parent_chain(tree, key);
        }
        path
    }

    // ========================================================================
    // REFRESH PIPELINE
    // ========================================================================

    /// Runs the pipeline from `params.step` to the end and publishes one
    /// model-updated event.
    pub fn refresh_model(&mut self, params: RefreshParams) {
        self.refresh_with_path(params, None);
    }

    fn refresh_with_path(&mut self, params: RefreshParams, mut changed: Option<ChangedPath>) {
        debug!("refreshing model from step {:?}", params.step);
        let start = params.step.position();
        for &step in &STEP_ORDER[start..] {
            self.run_step(step, changed.as_mut());
        }
        self.events.publish(&GridEvent::ModelUpdated {
            animate: params.animate,
            keep_rendered_rows: params.keep_rendered_rows,
            new_data: params.new_data,
        });
    }

    fn run_step(&mut self, step: RefreshStep, changed: Option<&mut ChangedPath>) {
        match step {
            RefreshStep::Everything => {
                if let Some(stage) = &mut self.group_stage {
                    stage.execute(self.manager.tree_mut(), changed);
                } else if !self.manager.is_legacy_tree_mode() {
                    // Legacy nested data is grouped by the manager at
                    // build time; overwriting it here would flatten the
                    // user's hierarchy.
                    passthrough_group(self.manager.tree_mut());
                }
            }
            RefreshStep::Filter => {
                let policy = self.config.group_filter_policy;
                let groups_selectable = self.config.groups_selectable;
                let tree = self.manager.tree_mut();
                match &self.custom_evaluator {
                    Some(evaluator) => run_filter(
                        tree,
                        evaluator.as_ref(),
                        policy,
                        groups_selectable,
                        changed.as_deref(),
                    ),
                    None => {
                        let evaluator = CriteriaEvaluator::new(&self.fields, &self.filter_model);
                        run_filter(tree, &evaluator, policy, groups_selectable, changed.as_deref());
                    }
                }
            }
            RefreshStep::Pivot => {
                if let Some(stage) = &mut self.pivot_stage {
                    stage.execute(self.manager.tree_mut(), changed);
                }
            }
            RefreshStep::Aggregate => {
                if let Some(stage) = &mut self.aggregation_stage {
                    stage.execute(self.manager.tree_mut(), changed);
                }
            }
            RefreshStep::Sort => {
                let tree = self.manager.tree_mut();
                run_sort(
                    tree,
                    &self.sort_model,
                    &self.comparators,
                    &self.fields,
                    self.row_node_order.as_ref(),
                    changed.as_deref(),
                );
            }
            RefreshStep::Map => {
                let tree = self.manager.tree_mut();
                self.displayed = run_flatten(
                    tree,
                    self.config.default_row_height,
                    self.row_height_callback.as_ref(),
                );
            }
        }
    }

    // ========================================================================
    // SORT AND FILTER STATE
    // ========================================================================

    /// Replaces the sort model and resorts. Clears any manual row order;
    /// an explicit sort supersedes a drag reorder.
    pub fn set_sort_model(&mut self, model: SortModel) {
        self.sort_model = model;
        self.row_node_order = None;
        self.refresh_model(RefreshParams::from_step(RefreshStep::Sort));
    }

    pub fn sort_model(&self) -> &[SortModelItem] {
        &self.sort_model
    }

    /// Installs (or clears) a manual id-to-position row order.
    pub fn set_row_node_order(&mut self, order: Option<FxHashMap<RowId, usize>>) {
        self.row_node_order = order;
        self.refresh_model(RefreshParams::from_step(RefreshStep::Sort));
    }

    pub fn set_column_filter(&mut self, col_id: impl Into<String>, criteria: FilterCriteria) {
        self.filter_model.set(col_id, criteria);
        self.refresh_model(RefreshParams::from_step(RefreshStep::Filter));
    }

    /// Returns false when no filter was present for the column.
    pub fn remove_column_filter(&mut self, col_id: &str) -> bool {
        let removed = self.filter_model.remove(col_id);
        if removed {
            self.refresh_model(RefreshParams::from_step(RefreshStep::Filter));
        }
        removed
    }

    pub fn clear_filters(&mut self) {
        self.filter_model.clear();
        self.refresh_model(RefreshParams::from_step(RefreshStep::Filter));
    }

    /// Installs a custom filter collaborator, replacing the built-in
    /// criteria evaluation; `None` reverts to the built-in.
    pub fn set_filter_evaluator(&mut self, evaluator: Option<Box<dyn FilterEvaluator<T>>>) {
        self.custom_evaluator = evaluator;
        self.refresh_model(RefreshParams::from_step(RefreshStep::Filter));
    }

    pub fn filter_model(&self) -> &ColumnFilterModel {
        &self.filter_model
    }

    // ========================================================================
    // STAGES
    // ========================================================================

    pub fn set_group_stage(&mut self, stage: Option<Box<dyn RowNodeStage<T>>>) {
        self.group_stage = stage;
        self.refresh_model(RefreshParams::from_step(RefreshStep::Everything));
    }

    pub fn set_pivot_stage(&mut self, stage: Option<Box<dyn RowNodeStage<T>>>) {
        self.pivot_stage = stage;
        self.refresh_model(RefreshParams::from_step(RefreshStep::Pivot));
    }

    pub fn set_aggregation_stage(&mut self, stage: Option<Box<dyn RowNodeStage<T>>>) {
        self.aggregation_stage = stage;
        self.refresh_model(RefreshParams::from_step(RefreshStep::Aggregate));
    }

    // ========================================================================
    // EXPAND / COLLAPSE
    // ========================================================================

    /// Sets one node's expansion and re-flattens. Returns false for
    /// unknown ids and for nodes that cannot expand.
    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> bool {
        let key = match self.manager.tree().lookup(id) {
            Some(key) => key,
            None => return false,
        };
        let changed = match self.manager.tree_mut().get_mut(key) {
            Some(node) if node.is_expandable() => {
                node.expanded = expanded;
                true
            }
            _ => false,
        };
        if changed {
            // The rows around the toggled group are still valid; the
            // renderer patches rather than redraws.
            self.refresh_model(RefreshParams {
                step: RefreshStep::Map,
                animate: true,
                keep_rendered_rows: true,
                new_data: false,
            });
        }
        changed
    }

    pub fn expand_all(&mut self) {
        self.set_all_expanded(true);
    }

    pub fn collapse_all(&mut self) {
        self.set_all_expanded(false);
    }

    fn set_all_expanded(&mut self, expanded: bool) {
        self.manager.tree_mut().for_each_node_mut(&mut |node| {
            // The synthetic root stays expanded.
            if node.group && node.level >= 0 {
                node.expanded = expanded;
            }
        });
        self.refresh_model(RefreshParams::from_step(RefreshStep::Map));
    }

    /// Snapshot of every live group's expansion, keyed by group key.
    pub fn expand_state(&self) -> FxHashMap<String, bool> {
        let mut state = FxHashMap::default();
        self.manager
            .tree()
            .for_each_depth_first(ChildList::AfterGroup, &mut |node| {
                if node.group {
                    if let Some(key) = &node.key {
                        state.insert(key.clone(), node.expanded);
                    }
                }
            });
        state
    }

    /// Applies a saved expansion snapshot to the live groups, keeps it
    /// for future rebuilds, and re-flattens.
    pub fn set_expand_state(&mut self, state: FxHashMap<String, bool>) {
        self.manager.tree_mut().for_each_node_mut(&mut |node| {
            if node.group {
                if let Some(key) = &node.key {
                    if let Some(&expanded) = state.get(key) {
                        node.expanded = expanded;
                    }
                }
            }
        });
        self.manager.set_expand_state(state);
        self.refresh_model(RefreshParams::from_step(RefreshStep::Map));
    }

    // ========================================================================
    // SELECTION
    // ========================================================================

    /// Selects or deselects one row. Refused (returns false) for unknown
    /// ids, for rows the filter made unselectable, and when the state
    /// would not change.
    pub fn set_node_selected(&mut self, id: &str, selected: bool) -> bool {
        let key = match self.manager.tree().lookup(id) {
            Some(key) => key,
            None => return false,
        };
        let changed = match self.manager.tree_mut().get_mut(key) {
            Some(node) => {
                let target = if selected {
                    SelectionState::Selected
                } else {
                    SelectionState::NotSelected
                };
                if selected && !node.selectable {
                    false
                } else if node.selected == target {
                    false
                } else {
                    node.selected = target;
                    true
                }
            }
            None => false,
        };
        if changed {
            self.events.publish(&GridEvent::SelectionChanged {
                row_ids: vec![id.to_string()],
            });
        }
        changed
    }

    // ========================================================================
    // ROW HEIGHT
    // ========================================================================

    /// Installs (or clears) the per-row height hook and re-flattens.
    pub fn set_row_height_callback(&mut self, callback: Option<RowHeightCallback<T>>) {
        self.row_height_callback = callback;
        self.refresh_model(RefreshParams::from_step(RefreshStep::Map));
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Number of rows in the current display list.
    pub fn get_row_count(&self) -> usize {
        self.displayed.len()
    }

    /// True when the model holds no row data at all.
    pub fn is_empty(&self) -> bool {
        self.manager
            .tree()
            .root()
            .map(|root| root.all_leaf_children.is_empty() && root.children_after_group.is_empty())
            .unwrap_or(true)
    }

    /// Display row by index.
    pub fn get_row(&self, index: usize) -> Option<&RowNode<T>> {
        let key = self.displayed.key_at(index)?;
        self.manager.tree().get(key)
    }

    /// Node by public id, displayed or not.
    pub fn get_row_node(&self, id: &str) -> Option<&RowNode<T>> {
        let key = self.manager.tree().lookup(id)?;
        self.manager.tree().get(key)
    }

    /// Display index of the row covering the pixel offset.
    pub fn get_row_index_at_pixel(&self, pixel: f64) -> usize {
        self.displayed.index_at_pixel(pixel)
    }

    /// `(top, height)` of the display row at `index`.
    pub fn get_row_bounds(&self, index: usize) -> Option<(f64, f64)> {
        self.displayed.row_bounds(index)
    }

    pub fn get_total_height(&self) -> f64 {
        self.displayed.total_height()
    }

    /// Rows at the top level after sorting (groups count as one row).
    pub fn get_top_level_row_count(&self) -> usize {
        self.manager
            .tree()
            .root()
            .map(|root| root.children_after_sort.len())
            .unwrap_or(0)
    }

    pub fn displayed_rows(&self) -> &DisplayedRows {
        &self.displayed
    }

    // ========================================================================
    // ITERATION
    // ========================================================================

    /// Every node in the grouped tree, depth first.
    pub fn for_each_node(&self, f: &mut dyn FnMut(&RowNode<T>)) {
        self.manager
            .tree()
            .for_each_depth_first(ChildList::AfterGroup, f);
    }

    pub fn for_each_node_after_filter(&self, f: &mut dyn FnMut(&RowNode<T>)) {
        self.manager
            .tree()
            .for_each_depth_first(ChildList::AfterFilter, f);
    }

    pub fn for_each_node_after_filter_and_sort(&self, f: &mut dyn FnMut(&RowNode<T>)) {
        self.manager
            .tree()
            .for_each_depth_first(ChildList::AfterSort, f);
    }

    /// Every data row in raw insertion order.
    pub fn for_each_leaf_node(&self, f: &mut dyn FnMut(&RowNode<T>)) {
        let tree = self.manager.tree();
        let leaves = match tree.root() {
            Some(root) => root.all_leaf_children.clone(),
            None => return,
        };
        for key in leaves {
            if let Some(node) = tree.get(key) {
                f(node);
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
