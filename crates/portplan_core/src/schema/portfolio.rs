//! Declaration of the project portfolio store and its forms.
//!
//! # Invariants
//! - Table and column names match the migrations under `db/migrations`.
//! - Vocabulary `foo` lives in table `foolist` with `fooID` / `fooDesc`.
//! - A single-valued vocabulary `foo` on a working table is stored in column
//!   `fooID` and exposed as relationship `foo`; a multi-valued one is exposed
//!   as relationship `foos` through association table `foo`.

use super::catalog::{
    AssociationLink, Cardinality, CatalogError, ColumnDef, ColumnType, SchemaCatalog, TableDef,
    TableRole,
};
use super::forms::{choices, field, ChoiceOrder, FieldWidget, FormCatalog};

/// Root entity table.
pub const ROOT_TABLE: &str = "description";
/// Tables never offered to the resolver.
pub const HIDDEN_TABLES: &[&str] = &["fiscalyears", "user"];

const VOCABULARIES_WITH_TEXT: &[&str] = &[
    "complexity",
    "costlevel",
    "disposition",
    "driver",
    "final",
    "fundingsource",
    "host",
    "initiative",
    "maturity",
    "progress",
    "proj_visibility",
    "risklevel",
    "scope",
    "sponsor",
    "stakeholder",
    "strategy",
    "technology",
    "type",
    "visibility",
];
const VOCABULARIES_WITHOUT_TEXT: &[&str] = &["child", "flavor"];

const PORTFOLIO_REFERENCES: &[&str] = &[
    "flavor",
    "initiative",
    "scope",
    "complexity",
    "visibility",
    "risklevel",
    "costlevel",
];
const PROJECT_REFERENCES: &[&str] = &["progress", "proj_visibility"];

/// Builds the validated catalog of the portfolio store.
pub fn portfolio_catalog() -> Result<SchemaCatalog, CatalogError> {
    let mut tables = vec![
        description_table(),
        portfolio_table(),
        project_table(),
        disposition_table("disposition", true, "dispositionLastModified"),
        disposition_table("latest_disposition", false, "latestDispositionLastModified"),
        comment_table(),
        association_table("child", ROOT_TABLE),
        association_table("driver", ROOT_TABLE),
        association_table("stakeholder", ROOT_TABLE),
        association_table("strategy", "portfolio"),
    ];

    let mut roots = VOCABULARIES_WITH_TEXT
        .iter()
        .chain(VOCABULARIES_WITHOUT_TEXT)
        .copied()
        .collect::<Vec<_>>();
    roots.sort_unstable();
    tables.extend(roots.into_iter().map(vocabulary_table));

    tables.push(
        TableDef::new("fiscalyears", TableRole::Hidden)
            .column(int("fiscalyearID").primary_key())
            .column(ColumnDef::new("fiscalyearDesc", ColumnType::String)),
    );
    tables.push(
        TableDef::new("user", TableRole::Hidden)
            .column(int("id").primary_key())
            .column(ColumnDef::new("username", ColumnType::String))
            .column(ColumnDef::new("email", ColumnType::String)),
    );

    SchemaCatalog::new(tables)
}

/// Form fields of the description, portfolio, project, disposition and
/// comment forms.
pub fn portfolio_forms() -> FormCatalog {
    use FieldWidget::{Date, DateTime, MultiSelect, Number, Select, Text, TextArea};

    let d = ROOT_TABLE;
    let mut fields = vec![
        field(d, "name", "name", Text),
        field(d, "abstract", "abstract", TextArea),
        field(d, "rationale", "rationale", TextArea),
        field(d, "businesscase", "business case", TextArea),
        field(d, "dependencies", "dependencies", TextArea),
        field(d, "maturity", "maturity", Select(choices("maturitylist", ChoiceOrder::ById))),
        field(d, "proposer", "proposer", Text),
        field(d, "customer", "customer", Text),
        field(d, "sponsor", "sponsor", Select(choices("sponsorlist", ChoiceOrder::ByDescription))),
        field(
            d,
            "fundingsource",
            "funding source",
            Select(choices("fundingsourcelist", ChoiceOrder::ById)),
        ),
        field(d, "host", "host", Select(choices("hostlist", ChoiceOrder::ByDescription))),
        field(
            d,
            "stakeholders",
            "stakeholders",
            MultiSelect(choices("stakeholderlist", ChoiceOrder::ByDescription)),
        ),
        field(
            d,
            "technology",
            "technology",
            Select(choices("technologylist", ChoiceOrder::ById)),
        ),
        field(d, "type", "type", Select(choices("typelist", ChoiceOrder::ByDescription))),
        field(
            d,
            "drivers",
            "drivers",
            MultiSelect(choices("driverlist", ChoiceOrder::Natural)),
        ),
        field(d, "created", "created", Date),
        field(d, "ended", "ended", Date),
        field(d, "final", "final state", Select(choices("finallist", ChoiceOrder::ById))),
        field(d, "childs", "children", MultiSelect(choices("childlist", ChoiceOrder::ById))),
        field(
            d,
            "latest_dispositions",
            "disposition",
            MultiSelect(choices("dispositionlist", ChoiceOrder::ByDescription)),
        ),
        field(d, "descriptionLastModified", "last updated", DateTime),
        field(d, "descriptionLastModifiedBy", "last updated by", Text),
    ];

    let p = "portfolio";
    fields.extend([
        field(
            p,
            "flavor",
            "portfolio category",
            Select(choices("flavorlist", ChoiceOrder::Natural)),
        ),
        field(
            p,
            "strategys",
            "strategies",
            MultiSelect(choices("strategylist", ChoiceOrder::ByDescription)),
        ),
        field(
            p,
            "initiative",
            "initiative",
            Select(choices("initiativelist", ChoiceOrder::ByDescription)),
        ),
        field(p, "scope", "scope", Select(choices("scopelist", ChoiceOrder::Natural))),
        field(
            p,
            "complexity",
            "complexity",
            Select(choices("complexitylist", ChoiceOrder::Natural)),
        ),
        field(
            p,
            "visibility",
            "visibility",
            Select(choices("visibilitylist", ChoiceOrder::Natural)),
        ),
        field(
            p,
            "risklevel",
            "risk level",
            Select(choices("risklevellist", ChoiceOrder::Natural)),
        ),
        field(
            p,
            "costlevel",
            "cost level",
            Select(choices("costlevellist", ChoiceOrder::Natural)),
        ),
        field(p, "rpu", "effort", Number),
        field(p, "budgetIn", "budget in", Date),
        field(p, "portfolioLastModified", "last updated", DateTime),
        field(p, "portfolioLastModifiedBy", "last updated by", Text),
    ]);

    let j = "project";
    fields.extend([
        field(j, "project_url", "project url", Text),
        field(j, "progress", "progress", Select(choices("progresslist", ChoiceOrder::ById))),
        field(j, "proj_manager", "project manager", Text),
        field(j, "tech_manager", "technical manager", Text),
        field(
            j,
            "proj_visibility",
            "project visibility",
            Select(choices("proj_visibilitylist", ChoiceOrder::ById)),
        ),
        field(j, "startedOn", "started", Date),
        field(j, "finishedOn", "finished", Date),
        field(j, "projectLastModified", "last updated", DateTime),
        field(j, "projectLastModifiedBy", "last updated by", Text),
    ]);

    for table in ["disposition", "latest_disposition"] {
        fields.extend([
            field(table, "disposedIn", "disposed", Date),
            field(
                table,
                "disposition",
                "disposition",
                Select(choices("dispositionlist", ChoiceOrder::ByDescription)),
            ),
            field(table, "explanation", "explanation", TextArea),
            field(table, "reconsiderIn", "reconsider", Date),
            field(table, "plannedFor", "start", Text),
        ]);
    }
    fields.push(field("disposition", "dispositionLastModified", "last updated", DateTime));
    fields.push(field(
        "latest_disposition",
        "latestDispositionLastModified",
        "last updated",
        DateTime,
    ));

    let c = "comment";
    fields.extend([
        field(c, "comment", "comment", TextArea),
        field(c, "commentAuthor", "created by", Text),
        field(c, "commentAuthored", "on", DateTime),
        field(c, "commentEditor", "last edited by", Text),
        field(c, "commentEdited", "on", DateTime),
    ]);

    FormCatalog::new(
        fields,
        vec![ROOT_TABLE.to_string(), "portfolio".to_string(), "project".to_string()],
    )
}

fn int(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Integer)
}

fn root_link() -> ColumnDef {
    int("projectID").references(ROOT_TABLE, "projectID")
}

fn vocabulary_ref(root: &str) -> ColumnDef {
    int(&format!("{root}ID")).references(format!("{root}list"), format!("{root}ID"))
}

fn with_references(mut table: TableDef, roots: &[&str]) -> TableDef {
    for root in roots {
        table = table.column(vocabulary_ref(root)).relationship(
            *root,
            format!("{root}list"),
            Cardinality::ManyToOne {
                column: format!("{root}ID"),
            },
        );
    }
    table
}

fn many_to_many(owner: TableDef, root: &str) -> TableDef {
    owner.relationship(
        format!("{root}s"),
        format!("{root}list"),
        Cardinality::ManyToMany(AssociationLink {
            table: root.to_string(),
            owner_column: "projectID".to_string(),
            vocabulary_column: format!("{root}ID"),
        }),
    )
}

fn description_table() -> TableDef {
    let table = TableDef::new(ROOT_TABLE, TableRole::Root)
        .column(int("projectID").primary_key())
        .column(ColumnDef::new("name", ColumnType::String))
        .column(ColumnDef::new("abstract", ColumnType::Text))
        .column(ColumnDef::new("rationale", ColumnType::Text))
        .column(ColumnDef::new("businesscase", ColumnType::Text))
        .column(ColumnDef::new("dependencies", ColumnType::Text))
        .column(ColumnDef::new("proposer", ColumnType::String))
        .column(ColumnDef::new("customer", ColumnType::String))
        .column(ColumnDef::new("created", ColumnType::Date))
        .column(ColumnDef::new("ended", ColumnType::Date))
        .column(ColumnDef::new("descriptionLastModified", ColumnType::Timestamp))
        .column(ColumnDef::new("descriptionLastModifiedBy", ColumnType::String));

    let table = with_references(
        table,
        &["maturity", "sponsor", "fundingsource", "host", "technology", "type", "final"],
    );
    let table = ["child", "driver", "stakeholder"]
        .into_iter()
        .fold(table, many_to_many);

    table
        .relationship("portfolio", "portfolio", Cardinality::BackReference)
        .relationship("project", "project", Cardinality::BackReference)
        .relationship("latest_disposition", "latest_disposition", Cardinality::BackReference)
        .relationship("dispositions", "disposition", Cardinality::BackReference)
        .relationship("comments", "comment", Cardinality::BackReference)
}

fn portfolio_table() -> TableDef {
    let table = TableDef::new("portfolio", TableRole::Satellite { many: false })
        .column(root_link().primary_key())
        .column(ColumnDef::new("rpu", ColumnType::Float))
        .column(ColumnDef::new("budgetIn", ColumnType::Date))
        .column(int("budgetInFY"))
        .column(int("budgetInQ"))
        .column(ColumnDef::new("portfolioLastModified", ColumnType::Timestamp))
        .column(ColumnDef::new("portfolioLastModifiedBy", ColumnType::String));
    let table = with_references(table, PORTFOLIO_REFERENCES);
    many_to_many(table, "strategy").relationship(
        "description",
        ROOT_TABLE,
        Cardinality::BackReference,
    )
}

fn project_table() -> TableDef {
    let table = TableDef::new("project", TableRole::Satellite { many: false })
        .column(root_link().primary_key())
        .column(ColumnDef::new("project_url", ColumnType::String))
        .column(ColumnDef::new("proj_manager", ColumnType::String))
        .column(ColumnDef::new("tech_manager", ColumnType::String))
        .column(ColumnDef::new("startedOn", ColumnType::Date))
        .column(ColumnDef::new("finishedOn", ColumnType::Date))
        .column(ColumnDef::new("projectLastModified", ColumnType::Timestamp))
        .column(ColumnDef::new("projectLastModifiedBy", ColumnType::String));
    with_references(table, PROJECT_REFERENCES).relationship(
        "description",
        ROOT_TABLE,
        Cardinality::BackReference,
    )
}

fn disposition_table(name: &str, many: bool, modified_column: &str) -> TableDef {
    let table = TableDef::new(name, TableRole::Satellite { many })
        .column(root_link().primary_key())
        .column(ColumnDef::new("disposedIn", ColumnType::Date))
        .column(ColumnDef::new("reconsiderIn", ColumnType::Date))
        .column(ColumnDef::new("explanation", ColumnType::Text))
        .column(ColumnDef::new("plannedFor", ColumnType::String))
        .column(ColumnDef::new(modified_column, ColumnType::Timestamp))
        .column(ColumnDef::new(
            format!("{modified_column}By"),
            ColumnType::String,
        ));
    with_references(table, &["disposition"]).relationship(
        "description",
        ROOT_TABLE,
        Cardinality::BackReference,
    )
}

fn comment_table() -> TableDef {
    TableDef::new("comment", TableRole::Satellite { many: true })
        .column(int("commentID").primary_key())
        .column(root_link())
        .column(ColumnDef::new("comment", ColumnType::Text))
        .column(ColumnDef::new("commentAuthor", ColumnType::String))
        .column(ColumnDef::new("commentAuthored", ColumnType::Timestamp))
        .column(ColumnDef::new("commentEditor", ColumnType::String))
        .column(ColumnDef::new("commentEdited", ColumnType::Timestamp))
        .relationship("description", ROOT_TABLE, Cardinality::BackReference)
}

fn association_table(root: &str, owner: &str) -> TableDef {
    TableDef::new(root, TableRole::Association)
        .column(int("projectID").references(owner, "projectID"))
        .column(vocabulary_ref(root))
        .relationship(owner, owner, Cardinality::BackReference)
}

fn vocabulary_table(root: &str) -> TableDef {
    let mut table = TableDef::new(format!("{root}list"), TableRole::Vocabulary)
        .column(int(&format!("{root}ID")).primary_key())
        .column(ColumnDef::new(format!("{root}Desc"), ColumnType::String));
    if VOCABULARIES_WITH_TEXT.contains(&root) {
        table = table.column(ColumnDef::new(format!("{root}Text"), ColumnType::Text));
    }
    if root == "technology" {
        table = table.column(ColumnDef::new("technologyRationale", ColumnType::Text));
    }
    if PORTFOLIO_REFERENCES.contains(&root) {
        table = table.relationship("portfolio", "portfolio", Cardinality::BackReference);
    }
    if PROJECT_REFERENCES.contains(&root) {
        table = table.relationship("project", "project", Cardinality::BackReference);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::{portfolio_catalog, portfolio_forms};
    use crate::schema::catalog::Cardinality;

    #[test]
    fn catalog_declaration_validates() {
        let catalog = portfolio_catalog().expect("portfolio catalog should validate");
        assert_eq!(catalog.root().name, "description");
        assert_eq!(catalog.root_key(), "projectID");
        assert!(catalog.vocabulary("proj_visibilitylist").is_some());
    }

    #[test]
    fn multi_valued_vocabularies_are_association_relationships() {
        let catalog = portfolio_catalog().expect("portfolio catalog should validate");
        let rels = catalog.relationships_of("portfolio");
        let strategys = rels.get("strategys").expect("strategys relationship");
        match &strategys.cardinality {
            Cardinality::ManyToMany(link) => {
                assert_eq!(link.table, "strategy");
                assert_eq!(link.vocabulary_column, "strategyID");
            }
            other => panic!("unexpected cardinality: {other:?}"),
        }
    }

    #[test]
    fn latest_disposition_is_the_link_for_description_dispositions() {
        let catalog = portfolio_catalog().expect("portfolio catalog should validate");
        let link = catalog
            .association_between("description", "dispositionlist")
            .expect("link exists");
        assert_eq!(link.table, "latest_disposition");
        assert_eq!(link.vocabulary_column, "dispositionID");
    }

    #[test]
    fn every_breakdown_field_points_at_a_declared_vocabulary() {
        let catalog = portfolio_catalog().expect("portfolio catalog should validate");
        for field in portfolio_forms().select_fields() {
            let source = field.choice_source().expect("select field has choices");
            assert!(
                catalog.vocabulary(&source.vocabulary).is_some(),
                "{} has no vocabulary",
                field.id
            );
        }
    }
}
