//! SELECT statements over entity metadata.
//!
//! A [`SelectQuery`] is planned into a tree of [`PlanNode`]s, one per entity
//! occurrence (the root plus one per joined relation), then rendered. The
//! plan travels with the SQL so the hydrator can map labelled result columns
//! back onto entities.

use std::collections::HashSet;

use oxide_entity_core::dialect::Dialect;
use oxide_entity_core::metadata::{
    EntityId, EntityMetadata, MetadataRegistry, RelationMetadata, TableType,
};
use oxide_entity_core::types::ColumnType;
use oxide_entity_core::value::SqlValue;
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::expr::{CompiledQuery, Expr, PropertyResolver, SqlWriter};

/// Alias of the derived table used by `take`/`skip` pagination.
const DISTINCT_IDS_ALIAS: &str = "distinct_ids";
/// Label of the primary key selected by the pagination subquery.
const DISTINCT_ID_LABEL: &str = "ids_pk";
/// Label prefix of the ordering columns selected next to the key.
const DISTINCT_ORDER_LABEL: &str = "ids_order";

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `LEFT JOIN`, relation may be absent.
    Left,
    /// `INNER JOIN`, rows without the relation are dropped.
    Inner,
}

impl JoinKind {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Left => "LEFT JOIN",
            Self::Inner => "INNER JOIN",
        }
    }
}

/// Order direction for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    Asc,
    /// Descending order (DESC)
    Desc,
}

impl OrderDirection {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// An ordering specification over a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Property path (`alias.path` or a root property).
    pub path: String,
    /// Order direction.
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Ascending order on `path`.
    #[must_use]
    pub fn asc(path: &str) -> Self {
        Self {
            path: path.to_string(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending order on `path`.
    #[must_use]
    pub fn desc(path: &str) -> Self {
        Self {
            path: path.to_string(),
            direction: OrderDirection::Desc,
        }
    }

    /// Parses `"name"` (ascending) or `"-name"` (descending).
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        spec.strip_prefix('-').map_or_else(|| Self::asc(spec), Self::desc)
    }
}

/// A selected column and its result label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanColumn {
    /// Property path on the node's entity.
    pub property_path: String,
    /// Column name.
    pub database_name: String,
    /// Result label.
    pub label: String,
    /// Abstract type, used to normalize values on read.
    pub column_type: ColumnType,
    /// Part of the primary key.
    pub primary: bool,
    /// Discriminator column.
    pub is_discriminator: bool,
    /// Alias of the table holding the column.
    pub table_alias: String,
}

/// How a node is attached to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinLink {
    /// Parent node index.
    pub parent: usize,
    /// Relation followed from the parent.
    pub relation: RelationMetadata,
    /// Alias of the parent table holding the relation.
    pub source_alias: String,
    /// Alias of the junction table of a many-to-many hop.
    pub junction_alias: Option<String>,
    /// Join type.
    pub kind: JoinKind,
}

/// One entity occurrence in a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    /// Query alias.
    pub alias: String,
    /// Entity selected at this node.
    pub entity: EntityId,
    /// Physical tables, the entity's own first, then class-table ancestors.
    pub tables: Vec<(EntityId, String)>,
    /// Selected columns.
    pub columns: Vec<PlanColumn>,
    /// Nodes joined from this one.
    pub children: Vec<usize>,
    /// Attachment to the parent; `None` for the root.
    pub link: Option<JoinLink>,
}

impl PlanNode {
    /// Primary-key columns.
    pub fn primary_columns(&self) -> impl Iterator<Item = &PlanColumn> {
        self.columns.iter().filter(|c| c.primary)
    }

    /// Column by property path.
    #[must_use]
    pub fn column(&self, property_path: &str) -> Option<&PlanColumn> {
        self.columns.iter().find(|c| c.property_path == property_path)
    }
}

/// The planned shape of a select; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectPlan {
    /// Nodes, parents before children.
    pub nodes: Vec<PlanNode>,
}

impl SelectPlan {
    /// Root node.
    #[must_use]
    pub fn root(&self) -> &PlanNode {
        &self.nodes[0]
    }

    /// Node by alias.
    #[must_use]
    pub fn find_alias(&self, alias: &str) -> Option<&PlanNode> {
        self.nodes.iter().find(|n| n.alias == alias)
    }

    /// Every result label, in select-list order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .flat_map(|n| n.columns.iter().map(|c| c.label.as_str()))
    }

    fn has_collection_join(&self) -> bool {
        self.nodes
            .iter()
            .filter_map(|n| n.link.as_ref())
            .any(|l| l.relation.kind.is_collection())
    }
}

/// A built select: SQL, parameters and the plan for hydration.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSelect {
    /// SQL text and parameters.
    pub query: CompiledQuery,
    /// Result shape.
    pub plan: SelectPlan,
}

#[derive(Debug, Clone)]
struct JoinRequest {
    path: String,
    alias: Option<String>,
    kind: JoinKind,
}

/// Builder for entity selects with relation joins.
///
/// # Example
///
/// ```rust
/// use oxide_entity_core::descriptor::{ColumnDescriptor, EntityDescriptor, RelationDescriptor};
/// use oxide_entity_core::dialect::{DialectCapability, DialectKind};
/// use oxide_entity_core::metadata::MetadataRegistry;
/// use oxide_entity_core::types::ColumnType;
/// use oxide_entity_query::{prop, SelectQuery};
///
/// let registry = MetadataRegistry::build(
///     DialectCapability::new(DialectKind::Postgres),
///     &[
///         EntityDescriptor::new("User")
///             .column(ColumnDescriptor::increment_primary("id"))
///             .relation(RelationDescriptor::one_to_many("addresses", "Address", "user")),
///         EntityDescriptor::new("Address")
///             .column(ColumnDescriptor::increment_primary("id"))
///             .column(ColumnDescriptor::new("city", ColumnType::Varchar))
///             .relation(RelationDescriptor::many_to_one("user", "User")),
///     ],
/// )
/// .unwrap();
///
/// let select = SelectQuery::new(&registry, "User", "user")
///     .unwrap()
///     .left_join_and_select("user.addresses", "address")
///     .where_(prop("address.city").eq("Paris"))
///     .build()
///     .unwrap();
/// assert!(select.query.sql.contains(r#"LEFT JOIN "address" "address" ON "address"."user_id" = "user"."id""#));
/// assert!(select.query.sql.ends_with(r#"WHERE "address"."city" = $1"#));
/// ```
#[derive(Debug, Clone)]
pub struct SelectQuery<'r> {
    registry: &'r MetadataRegistry,
    root: EntityId,
    alias: String,
    joins: Vec<JoinRequest>,
    eager: bool,
    filter: Option<Expr>,
    order: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    take: Option<u64>,
    skip: Option<u64>,
}

impl<'r> SelectQuery<'r> {
    /// Starts a select of `entity` under `alias`.
    pub fn new(registry: &'r MetadataRegistry, entity: &str, alias: &str) -> Result<Self> {
        let root = registry
            .find(entity)
            .ok_or_else(|| QueryError::UnknownEntity(entity.to_string()))?
            .id;
        Ok(Self::for_entity(registry, root, alias))
    }

    /// Starts a select of the entity `root` under `alias`.
    #[must_use]
    pub fn for_entity(registry: &'r MetadataRegistry, root: EntityId, alias: &str) -> Self {
        Self {
            registry,
            root,
            alias: alias.to_string(),
            joins: Vec::new(),
            eager: false,
            filter: None,
            order: Vec::new(),
            limit: None,
            offset: None,
            take: None,
            skip: None,
        }
    }

    /// Left-joins the relation at `path` (`alias.relation`) and selects it
    /// under `alias`.
    #[must_use]
    pub fn left_join_and_select(mut self, path: &str, alias: &str) -> Self {
        self.joins.push(JoinRequest {
            path: path.to_string(),
            alias: Some(alias.to_string()),
            kind: JoinKind::Left,
        });
        self
    }

    /// Inner-joins the relation at `path` and selects it under `alias`.
    #[must_use]
    pub fn inner_join_and_select(mut self, path: &str, alias: &str) -> Self {
        self.joins.push(JoinRequest {
            path: path.to_string(),
            alias: Some(alias.to_string()),
            kind: JoinKind::Inner,
        });
        self
    }

    /// Left-joins the relation at `path` under a generated alias
    /// (`{parent}_{property}`).
    #[must_use]
    pub fn with_relation(mut self, path: &str) -> Self {
        self.joins.push(JoinRequest {
            path: path.to_string(),
            alias: None,
            kind: JoinKind::Left,
        });
        self
    }

    /// Joins every eager relation, recursively. A relation leading back to
    /// an entity already on the join path is not followed.
    #[must_use]
    pub const fn with_eager_relations(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Sets the filter, replacing any previous one.
    #[must_use]
    pub fn where_(mut self, expr: Expr) -> Self {
        self.filter = Some(expr);
        self
    }

    /// Adds a condition with AND.
    #[must_use]
    pub fn and_where(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.paren().and(expr.paren()),
            None => expr,
        });
        self
    }

    /// Adds an ordering.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    /// Row limit of the SQL statement.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Row offset of the SQL statement.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Number of root entities to load, independent of joined rows.
    #[must_use]
    pub const fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Number of root entities to skip, independent of joined rows.
    #[must_use]
    pub const fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Plans joins and labels without rendering SQL.
    pub fn plan(&self) -> Result<SelectPlan> {
        let mut planner = Planner::new(self.registry);
        planner.add_root(self.root, &self.alias);
        for join in &self.joins {
            let (parent_alias, property) = match join.path.split_once('.') {
                Some((alias, property)) => (alias, property),
                None => (self.alias.as_str(), join.path.as_str()),
            };
            let parent = planner
                .nodes
                .iter()
                .position(|n| n.alias == parent_alias)
                .ok_or_else(|| QueryError::UnknownAlias(parent_alias.to_string()))?;
            planner.join(parent, property, join.alias.clone(), join.kind)?;
        }
        if self.eager {
            planner.join_eager()?;
        }
        Ok(SelectPlan {
            nodes: planner.nodes,
        })
    }

    /// Builds the statement.
    pub fn build(&self) -> Result<CompiledSelect> {
        let plan = self.plan()?;
        let dialect = self.registry.dialect();
        let mut writer = SqlWriter::new(dialect);
        let renderer = Renderer {
            registry: self.registry,
            dialect,
            plan: &plan,
        };

        let columns: Vec<String> = plan
            .nodes
            .iter()
            .flat_map(|n| n.columns.iter())
            .map(|c| {
                format!(
                    "{}.{} AS {}",
                    dialect.quote_identifier(&c.table_alias),
                    dialect.quote_identifier(&c.database_name),
                    dialect.quote_identifier(&c.label)
                )
            })
            .collect();
        let mut sql = format!("SELECT {}", columns.join(", "));
        sql.push_str(&renderer.from_and_joins(&mut writer)?);

        let paginate_by_ids =
            (self.take.is_some() || self.skip.is_some()) && plan.has_collection_join();
        let mut conditions = renderer.root_conditions(&mut writer, self.filter.as_ref())?;
        if paginate_by_ids {
            conditions.push(self.distinct_ids_condition(&renderer, &mut writer)?);
        }
        sql.push_str(&where_clause(conditions, self.filter.is_some()));

        let (limit, offset) = if paginate_by_ids {
            (self.limit, self.offset)
        } else {
            (self.limit.or(self.take), self.offset.or(self.skip))
        };
        sql.push_str(&renderer.order_by(&mut writer, &self.order, limit.is_some() || offset.is_some())?);
        sql.push_str(&dialect.pagination(limit, offset));

        debug!(sql = %sql, parameters = writer.parameter_count(), "select built");
        Ok(CompiledSelect {
            query: writer.finish(sql),
            plan,
        })
    }

    /// Builds `SELECT COUNT(...)` over the same joins and filter, counting
    /// distinct root entities.
    pub fn build_count(&self) -> Result<CompiledQuery> {
        let plan = self.plan()?;
        let dialect = self.registry.dialect();
        let mut writer = SqlWriter::new(dialect);
        let renderer = Renderer {
            registry: self.registry,
            dialect,
            plan: &plan,
        };
        let root = plan.root();
        let keys: Vec<&PlanColumn> = root.primary_columns().collect();
        let counted = match keys.as_slice() {
            [key] => format!(
                "COUNT(DISTINCT {}.{})",
                dialect.quote_identifier(&key.table_alias),
                dialect.quote_identifier(&key.database_name)
            ),
            _ => String::from("COUNT(*)"),
        };
        let mut sql = format!("SELECT {counted} AS {}", dialect.quote_identifier("cnt"));
        sql.push_str(&renderer.from_and_joins(&mut writer)?);
        let conditions = renderer.root_conditions(&mut writer, self.filter.as_ref())?;
        sql.push_str(&where_clause(conditions, self.filter.is_some()));
        debug!(sql = %sql, "count built");
        Ok(writer.finish(sql))
    }

    /// `root.pk IN (SELECT pk FROM (SELECT DISTINCT root.pk ... LIMIT) ids)`
    fn distinct_ids_condition(&self, renderer: &Renderer<'_>, writer: &mut SqlWriter<'_>) -> Result<String> {
        let dialect = renderer.dialect;
        let root = renderer.plan.root();
        let keys: Vec<&PlanColumn> = root.primary_columns().collect();
        let [key] = keys.as_slice() else {
            return Err(QueryError::CompositeKeyPagination {
                entity: self.registry.get(root.entity).name.clone(),
            });
        };
        let key_sql = format!(
            "{}.{}",
            dialect.quote_identifier(&key.table_alias),
            dialect.quote_identifier(&key.database_name)
        );
        let label = dialect.quote_identifier(DISTINCT_ID_LABEL);
        let mut projection = vec![format!("{key_sql} AS {label}")];
        let mut ordering = Vec::with_capacity(self.order.len() + 1);
        let mut key_ordered = false;
        for (i, order) in self.order.iter().enumerate() {
            let column = Expr::Property(order.path.clone()).render(writer, renderer)?;
            if column == key_sql {
                key_ordered = true;
            } else {
                // DISTINCT requires every ORDER BY term in the select list
                let order_label = dialect.quote_identifier(&format!("{DISTINCT_ORDER_LABEL}_{i}"));
                projection.push(format!("{column} AS {order_label}"));
            }
            ordering.push(format!("{column} {}", order.direction.as_sql()));
        }
        if !key_ordered {
            ordering.push(format!("{key_sql} ASC"));
        }

        let mut inner = format!("SELECT DISTINCT {}", projection.join(", "));
        inner.push_str(&renderer.from_and_joins(writer)?);
        let conditions = renderer.root_conditions(writer, self.filter.as_ref())?;
        inner.push_str(&where_clause(conditions, self.filter.is_some()));
        inner.push_str(&format!(" ORDER BY {}", ordering.join(", ")));
        inner.push_str(&dialect.pagination(self.take, self.skip));
        let ids = dialect.quote_identifier(DISTINCT_IDS_ALIAS);
        Ok(format!("{key_sql} IN (SELECT {ids}.{label} FROM ({inner}) {ids})"))
    }
}

struct Planner<'r> {
    registry: &'r MetadataRegistry,
    max_identifier: Option<usize>,
    nodes: Vec<PlanNode>,
    aliases: HashSet<String>,
    labels: HashSet<String>,
    alias_counter: usize,
    label_counter: usize,
}

impl<'r> Planner<'r> {
    fn new(registry: &'r MetadataRegistry) -> Self {
        Self {
            registry,
            max_identifier: registry.dialect().max_identifier_length(),
            nodes: Vec::new(),
            aliases: HashSet::new(),
            labels: HashSet::new(),
            alias_counter: 0,
            label_counter: 0,
        }
    }

    fn add_root(&mut self, entity: EntityId, alias: &str) {
        self.aliases.insert(alias.to_string());
        self.add_node(alias.to_string(), entity, None);
    }

    fn add_node(&mut self, alias: String, entity: EntityId, link: Option<JoinLink>) -> usize {
        let mut tables = vec![(entity, alias.clone())];
        for ancestor in class_table_ancestors(self.registry, entity) {
            let base = format!("{alias}_{}", self.registry.get(ancestor).table_name);
            let ancestor_alias =
                unique_identifier(&base, &mut self.aliases, self.max_identifier, &mut self.alias_counter);
            tables.push((ancestor, ancestor_alias));
        }

        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for (table_entity, table_alias) in &tables {
            for column in &self.registry.get(*table_entity).columns {
                if !seen.insert(column.database_name.clone()) {
                    continue;
                }
                let base = format!("{alias}_{}", column.label_fragment());
                let label =
                    unique_identifier(&base, &mut self.labels, self.max_identifier, &mut self.label_counter);
                columns.push(PlanColumn {
                    property_path: column.property_path.clone(),
                    database_name: column.database_name.clone(),
                    label,
                    column_type: column.column_type,
                    primary: column.primary,
                    is_discriminator: column.is_discriminator,
                    table_alias: table_alias.clone(),
                });
            }
        }

        let index = self.nodes.len();
        if let Some(link) = &link {
            self.nodes[link.parent].children.push(index);
        }
        self.nodes.push(PlanNode {
            alias,
            entity,
            tables,
            columns,
            children: Vec::new(),
            link,
        });
        index
    }

    fn find_relation(&self, node: usize, property: &str) -> Result<(RelationMetadata, String)> {
        let node = &self.nodes[node];
        node.tables
            .iter()
            .find_map(|(entity, alias)| {
                self.registry
                    .get(*entity)
                    .relation(property)
                    .map(|r| (r.clone(), alias.clone()))
            })
            .ok_or_else(|| QueryError::UnknownRelation {
                entity: self.registry.get(node.entity).name.clone(),
                relation: property.to_string(),
            })
    }

    fn join(&mut self, parent: usize, property: &str, alias: Option<String>, kind: JoinKind) -> Result<usize> {
        let (relation, source_alias) = self.find_relation(parent, property)?;
        let alias = match alias {
            Some(alias) => {
                if !self.aliases.insert(alias.clone()) {
                    return Err(QueryError::DuplicateAlias(alias));
                }
                alias
            }
            None => {
                let base = format!("{}_{property}", self.nodes[parent].alias);
                unique_identifier(&base, &mut self.aliases, self.max_identifier, &mut self.alias_counter)
            }
        };
        let junction_alias = relation.junction.as_ref().map(|j| {
            let base = format!("{alias}_{}", j.table_name);
            unique_identifier(&base, &mut self.aliases, self.max_identifier, &mut self.alias_counter)
        });
        let target = relation.target;
        let link = JoinLink {
            parent,
            relation,
            source_alias,
            junction_alias,
            kind,
        };
        Ok(self.add_node(alias, target, Some(link)))
    }

    fn join_eager(&mut self) -> Result<()> {
        let mut index = 0;
        while index < self.nodes.len() {
            let path = self.entity_path(index);
            let joined: HashSet<String> = self.nodes[index]
                .children
                .iter()
                .filter_map(|c| self.nodes[*c].link.as_ref())
                .map(|l| l.relation.property.clone())
                .collect();
            let registry = self.registry;
            let eager: Vec<String> = self.nodes[index]
                .tables
                .iter()
                .flat_map(|(entity, _)| registry.get(*entity).relations.iter())
                .filter(|r| r.eager && !joined.contains(&r.property) && !path.contains(&r.target))
                .map(|r| r.property.clone())
                .collect();
            for property in eager {
                self.join(index, &property, None, JoinKind::Left)?;
            }
            index += 1;
        }
        Ok(())
    }

    /// Entities from the root down to `node`.
    fn entity_path(&self, node: usize) -> Vec<EntityId> {
        let mut path = vec![self.nodes[node].entity];
        let mut current = &self.nodes[node];
        while let Some(link) = &current.link {
            current = &self.nodes[link.parent];
            path.push(current.entity);
        }
        path
    }
}

/// Class-table ancestors of `entity`, nearest first.
fn class_table_ancestors(registry: &MetadataRegistry, entity: EntityId) -> Vec<EntityId> {
    let mut ancestors = Vec::new();
    let mut current = registry.get(entity);
    while let Some(parent) = current.parent.filter(|_| current.is_class_table_child()) {
        ancestors.push(parent);
        current = registry.get(parent);
    }
    ancestors
}

/// Truncates `base` to the identifier limit and suffixes a counter until it
/// is unused.
fn unique_identifier(base: &str, used: &mut HashSet<String>, max: Option<usize>, counter: &mut usize) -> String {
    let mut candidate = truncate(base, max);
    while used.contains(&candidate) {
        *counter += 1;
        let suffix = format!("_{counter}");
        let room = max.map(|m| m.saturating_sub(suffix.len()));
        candidate = format!("{}{suffix}", truncate(base, room));
    }
    used.insert(candidate.clone());
    candidate
}

fn truncate(s: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if s.chars().count() > max => s.chars().take(max).collect(),
        _ => s.to_string(),
    }
}

/// Discriminator values of `entity` and its descendants.
pub(crate) fn discriminator_values(registry: &MetadataRegistry, entity: EntityId) -> Vec<String> {
    registry
        .descendants(entity)
        .into_iter()
        .filter_map(|id| registry.get(id).discriminator_value.clone())
        .collect()
}

pub(crate) fn table_path(dialect: &dyn Dialect, entity: &EntityMetadata) -> String {
    dialect.table_path(&entity.table_name, entity.schema.as_deref(), entity.database.as_deref())
}

struct Renderer<'a> {
    registry: &'a MetadataRegistry,
    dialect: &'static dyn Dialect,
    plan: &'a SelectPlan,
}

impl Renderer<'_> {
    fn q(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    fn col(&self, alias: &str, column: &str) -> String {
        format!("{}.{}", self.q(alias), self.q(column))
    }

    fn from_and_joins(&self, writer: &mut SqlWriter<'_>) -> Result<String> {
        let root = self.plan.root();
        let entity = self.registry.get(root.entity);
        let mut sql = format!(" FROM {} {}", table_path(self.dialect, entity), self.q(&root.alias));
        sql.push_str(&self.ancestor_joins(root, JoinKind::Inner));
        for node in self.plan.nodes.iter().skip(1) {
            sql.push_str(&self.join(writer, node)?);
        }
        Ok(sql)
    }

    fn join(&self, writer: &mut SqlWriter<'_>, node: &PlanNode) -> Result<String> {
        let Some(link) = &node.link else {
            return Ok(String::new());
        };
        let parent = &self.plan.nodes[link.parent];
        let relation = &link.relation;
        let keyword = link.kind.as_sql();
        let target = self.registry.get(node.entity);
        let mut sql = String::new();

        let mut on: Vec<String> = match (&relation.junction, &link.junction_alias) {
            (Some(junction), Some(junction_alias)) => {
                let junction_entity = self.registry.get(junction.entity);
                let owner: Vec<String> = junction
                    .owner_columns
                    .iter()
                    .map(|c| {
                        format!(
                            "{} = {}",
                            self.col(junction_alias, &c.name),
                            self.col(&parent.alias, &c.referenced_column)
                        )
                    })
                    .collect();
                sql.push_str(&format!(
                    " {keyword} {} {} ON {}",
                    table_path(self.dialect, junction_entity),
                    self.q(junction_alias),
                    owner.join(" AND ")
                ));
                junction
                    .inverse_columns
                    .iter()
                    .map(|c| {
                        format!(
                            "{} = {}",
                            self.col(&node.alias, &c.referenced_column),
                            self.col(junction_alias, &c.name)
                        )
                    })
                    .collect()
            }
            _ if relation.has_local_foreign_key() => relation
                .join_columns
                .iter()
                .map(|c| {
                    format!(
                        "{} = {}",
                        self.col(&node.alias, &c.referenced_column),
                        self.col(&link.source_alias, &c.name)
                    )
                })
                .collect(),
            _ => relation
                .join_columns
                .iter()
                .map(|c| {
                    format!(
                        "{} = {}",
                        self.col(&node.alias, &c.name),
                        self.col(&parent.alias, &c.referenced_column)
                    )
                })
                .collect(),
        };
        if target.table_type == TableType::StiChild {
            on.push(self.discriminator_condition(writer, &node.alias, target));
        }
        sql.push_str(&format!(
            " {keyword} {} {} ON {}",
            table_path(self.dialect, target),
            self.q(&node.alias),
            on.join(" AND ")
        ));
        sql.push_str(&self.ancestor_joins(node, link.kind));
        Ok(sql)
    }

    fn ancestor_joins(&self, node: &PlanNode, kind: JoinKind) -> String {
        let mut sql = String::new();
        for (ancestor, alias) in node.tables.iter().skip(1) {
            let entity = self.registry.get(*ancestor);
            let on: Vec<String> = entity
                .primary_columns()
                .map(|c| {
                    format!(
                        "{} = {}",
                        self.col(alias, &c.database_name),
                        self.col(&node.alias, &c.database_name)
                    )
                })
                .collect();
            sql.push_str(&format!(
                " {} {} {} ON {}",
                kind.as_sql(),
                table_path(self.dialect, entity),
                self.q(alias),
                on.join(" AND ")
            ));
        }
        sql
    }

    fn discriminator_condition(&self, writer: &mut SqlWriter<'_>, alias: &str, entity: &EntityMetadata) -> String {
        let column = entity.discriminator_column.clone().unwrap_or_default();
        let placeholders: Vec<String> = discriminator_values(self.registry, entity.id)
            .into_iter()
            .map(|v| writer.bind(SqlValue::Text(v)))
            .collect();
        format!("{} IN ({})", self.col(alias, &column), placeholders.join(", "))
    }

    /// Filter first, then the discriminator restriction of a single-table
    /// child root.
    fn root_conditions(&self, writer: &mut SqlWriter<'_>, filter: Option<&Expr>) -> Result<Vec<String>> {
        let mut conditions = Vec::new();
        if let Some(filter) = filter {
            conditions.push(filter.render(writer, self)?);
        }
        let root = self.plan.root();
        let entity = self.registry.get(root.entity);
        if entity.table_type == TableType::StiChild {
            conditions.push(self.discriminator_condition(writer, &root.alias, entity));
        }
        Ok(conditions)
    }

    fn order_by(&self, writer: &mut SqlWriter<'_>, order: &[OrderBy], paginated: bool) -> Result<String> {
        if order.is_empty() {
            if paginated && self.dialect.pagination_requires_order() {
                return Ok(String::from(" ORDER BY (SELECT NULL)"));
            }
            return Ok(String::new());
        }
        let parts = order
            .iter()
            .map(|o| {
                let column = Expr::Property(o.path.clone()).render(writer, self)?;
                Ok(format!("{column} {}", o.direction.as_sql()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(" ORDER BY {}", parts.join(", ")))
    }

    fn resolve_in(&self, node: &PlanNode, path: &str) -> Option<String> {
        if let Some(column) = node.column(path) {
            return Some(self.col(&column.table_alias, &column.database_name));
        }
        // a many-to-one property compares through its single foreign key
        node.tables.iter().find_map(|(entity, _)| {
            let relation = self.registry.get(*entity).relation(path)?;
            match relation.join_columns.as_slice() {
                [join] if relation.has_local_foreign_key() => node
                    .columns
                    .iter()
                    .find(|c| c.database_name == join.name)
                    .map(|c| self.col(&c.table_alias, &c.database_name)),
                _ => None,
            }
        })
    }
}

fn where_clause(mut conditions: Vec<String>, has_filter: bool) -> String {
    if conditions.is_empty() {
        return String::new();
    }
    if has_filter && conditions.len() > 1 {
        conditions[0] = format!("({})", conditions[0]);
    }
    format!(" WHERE {}", conditions.join(" AND "))
}

impl PropertyResolver for Renderer<'_> {
    fn resolve(&self, path: &str) -> Result<String> {
        let (node, property) = match path.split_once('.') {
            Some((alias, rest)) => self
                .plan
                .find_alias(alias)
                .map_or((self.plan.root(), path), |node| (node, rest)),
            None => (self.plan.root(), path),
        };
        self.resolve_in(node, property)
            .ok_or_else(|| QueryError::UnknownProperty {
                entity: self.registry.get(node.entity).name.clone(),
                property: property.to_string(),
            })
    }
}
