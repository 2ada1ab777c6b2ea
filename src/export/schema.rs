use anyhow::Result;
use rusqlite::{params, Connection};

/// Stored in `PRAGMA user_version` of every results database.
pub const RESULTS_SCHEMA_VERSION: usize = 1;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Only mutated when optional field assignments are passed.
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn keyword(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub foreign_key: Option<&'static ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
}

impl Table {
    pub fn create_sql(&self) -> String {
        let mut create_sql = format!("CREATE TABLE {} (", self.name);
        for (column_index, column) in self.columns.iter().enumerate() {
            if column_index > 0 {
                create_sql.push_str(", ");
            }
            create_sql.push_str(&format!("{} {}", column.name, column.sql_type.keyword()));
            if column.is_primary_key {
                create_sql.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                create_sql.push_str(" NOT NULL");
            }
            if let Some(foreign_key) = column.foreign_key {
                create_sql.push_str(&format!(
                    " REFERENCES {}({}) ON DELETE CASCADE",
                    foreign_key.foreign_table, foreign_key.foreign_column,
                ));
            }
        }
        for unique_constraint in self.unique_constraints {
            create_sql.push_str(&format!(", UNIQUE ({})", unique_constraint.join(", ")));
        }
        create_sql.push_str(");");
        create_sql
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// `INSERT INTO t (a, b) VALUES (?1, ?2)` over every column.
    pub fn insert_sql(&self) -> String {
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            self.column_names().join(", "),
            placeholders.join(", ")
        )
    }
}

const DOCUMENTS_ID: ForeignKey = ForeignKey {
    foreign_table: "documents",
    foreign_column: "id",
};

const TOPICS_TOPIC: ForeignKey = ForeignKey {
    foreign_table: "topics",
    foreign_column: "topic",
};

pub const DOCUMENTS_TABLE: Table = Table {
    name: "documents",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("band", &SqlType::Text, non_null = true),
        sqlite_column!("writer", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("cluster", &SqlType::Integer, non_null = true),
        sqlite_column!("dominant_topic", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_documents_cluster", "cluster"),
        ("idx_documents_dominant_topic", "dominant_topic"),
    ],
    unique_constraints: &[],
};

pub const TOPICS_TABLE: Table = Table {
    name: "topics",
    columns: &[
        sqlite_column!("topic", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("label", &SqlType::Text, non_null = true),
        sqlite_column!("frex", &SqlType::Text, non_null = true),
        sqlite_column!("lift", &SqlType::Text, non_null = true),
        sqlite_column!("score", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const DOCUMENT_TOPICS_TABLE: Table = Table {
    name: "document_topics",
    columns: &[
        sqlite_column!(
            "document_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&DOCUMENTS_ID)
        ),
        sqlite_column!(
            "topic",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TOPICS_TOPIC)
        ),
        sqlite_column!("weight", &SqlType::Real, non_null = true),
    ],
    indices: &[("idx_document_topics_topic", "topic")],
    unique_constraints: &[&["document_id", "topic"]],
};

pub const RUN_INFO_TABLE: Table = Table {
    name: "run_info",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// Tables in creation order, referenced tables first.
pub const RESULTS_TABLES: &[Table] = &[
    DOCUMENTS_TABLE,
    TOPICS_TABLE,
    DOCUMENT_TOPICS_TABLE,
    RUN_INFO_TABLE,
];

pub fn create_results_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON;", params![])?;
    for table in RESULTS_TABLES {
        table.create(conn)?;
    }
    conn.execute(
        &format!("PRAGMA user_version = {}", RESULTS_SCHEMA_VERSION),
        [],
    )?;
    Ok(())
}
