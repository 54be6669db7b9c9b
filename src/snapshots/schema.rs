//! Versioned layout of the `snapshots` table.
//!
//! [`FIELDS`] is the one ordered list of record columns. Each entry names the
//! schema version that introduced it; rows written under an older version read
//! the newer fields as their default. A [`SchemaPlan`] captures, once per store,
//! which of those columns the database actually has.

use std::collections::HashSet;

use crate::calc::model::InputRecord;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaVersion {
    /// First release of the cost form.
    V1 = 1,
    /// Adds `empleado_ventas` and `redes_sociales`.
    V2 = 2,
}

impl SchemaVersion {
    pub const CURRENT: SchemaVersion = SchemaVersion::V2;
    pub const ALL: [SchemaVersion; 2] = [SchemaVersion::V1, SchemaVersion::V2];

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(v: i64) -> Result<Self, CoreError> {
        match v {
            1 => Ok(SchemaVersion::V1),
            2 => Ok(SchemaVersion::V2),
            other => Err(CoreError::Persistence(format!(
                "unknown snapshot schema version {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Amount,
    Units,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub column: &'static str,
    pub kind: FieldKind,
    pub since: SchemaVersion,
    pub default: f64,
}

const fn amount(column: &'static str, since: SchemaVersion) -> FieldSpec {
    FieldSpec {
        column,
        kind: FieldKind::Amount,
        since,
        default: 0.0,
    }
}

pub const FIELD_COUNT: usize = 15;

/// Record columns in table order.
pub const FIELDS: [FieldSpec; FIELD_COUNT] = [
    amount("carne_fresca", SchemaVersion::V1),
    amount("sal", SchemaVersion::V1),
    amount("sueldo1", SchemaVersion::V1),
    amount("trabajador_adicional", SchemaVersion::V1),
    amount("empleado_ventas", SchemaVersion::V2),
    amount("redes_sociales", SchemaVersion::V2),
    amount("corte_carne", SchemaVersion::V1),
    amount("luz", SchemaVersion::V1),
    amount("agua", SchemaVersion::V1),
    amount("fumigacion", SchemaVersion::V1),
    amount("liquidos_limpieza", SchemaVersion::V1),
    amount("otro_liquido", SchemaVersion::V1),
    FieldSpec {
        column: "total_unidades",
        kind: FieldKind::Units,
        since: SchemaVersion::V1,
        default: 1.0,
    },
    amount("precio_venta", SchemaVersion::V1),
    amount("precio_venta_sugerido", SchemaVersion::V1),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Amount(f64),
    Units(i64),
}

impl FieldValue {
    fn amount(self) -> f64 {
        match self {
            FieldValue::Amount(v) => v,
            FieldValue::Units(v) => v as f64,
        }
    }

    fn units(self, column: &str) -> Result<i64, CoreError> {
        match self {
            FieldValue::Units(v) => Ok(v),
            FieldValue::Amount(v) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
            FieldValue::Amount(v) => Err(CoreError::Persistence(format!(
                "column `{}` holds a non-integer unit count {}",
                column, v
            ))),
        }
    }

    fn default_for(spec: &FieldSpec) -> Self {
        match spec.kind {
            FieldKind::Amount => FieldValue::Amount(spec.default),
            FieldKind::Units => FieldValue::Units(spec.default as i64),
        }
    }
}

/// Flattens a record into [`FIELDS`] order for writing.
pub fn to_columns(record: &InputRecord) -> [FieldValue; FIELD_COUNT] {
    use FieldValue::{Amount, Units};
    [
        Amount(record.carne_fresca),
        Amount(record.sal),
        Amount(record.sueldo1),
        Amount(record.trabajador_adicional),
        Amount(record.empleado_ventas),
        Amount(record.redes_sociales),
        Amount(record.corte_carne),
        Amount(record.luz),
        Amount(record.agua),
        Amount(record.fumigacion),
        Amount(record.liquidos_limpieza),
        Amount(record.otro_liquido),
        Units(record.total_unidades),
        Amount(record.precio_venta),
        Amount(record.precio_venta_sugerido),
    ]
}

fn from_columns(v: &[FieldValue; FIELD_COUNT]) -> Result<InputRecord, CoreError> {
    Ok(InputRecord {
        carne_fresca: v[0].amount(),
        sal: v[1].amount(),
        sueldo1: v[2].amount(),
        trabajador_adicional: v[3].amount(),
        empleado_ventas: v[4].amount(),
        redes_sociales: v[5].amount(),
        corte_carne: v[6].amount(),
        luz: v[7].amount(),
        agua: v[8].amount(),
        fumigacion: v[9].amount(),
        liquidos_limpieza: v[10].amount(),
        otro_liquido: v[11].amount(),
        total_unidades: v[12].units(FIELDS[12].column)?,
        precio_venta: v[13].amount(),
        precio_venta_sugerido: v[14].amount(),
    })
}

/// Which record columns exist in the database, resolved at store start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPlan {
    present: [bool; FIELD_COUNT],
    has_schema_version: bool,
    has_revision: bool,
}

impl SchemaPlan {
    pub fn current() -> Self {
        Self {
            present: [true; FIELD_COUNT],
            has_schema_version: true,
            has_revision: true,
        }
    }

    pub fn from_columns(columns: &HashSet<String>) -> Result<Self, CoreError> {
        for required in ["id", "name", "created_at"] {
            if !columns.contains(required) {
                return Err(CoreError::Persistence(format!(
                    "snapshots table has no `{}` column",
                    required
                )));
            }
        }
        let mut present = [false; FIELD_COUNT];
        for (slot, spec) in present.iter_mut().zip(FIELDS.iter()) {
            *slot = columns.contains(spec.column);
        }
        Ok(Self {
            present,
            has_schema_version: columns.contains("schema_version"),
            has_revision: columns.contains("revision"),
        })
    }

    /// True when every column of the current schema exists, so writes are possible.
    pub fn is_current(&self) -> bool {
        self.present.iter().all(|p| *p) && self.has_schema_version && self.has_revision
    }

    /// SQL expression for the version of a row in a table that predates the
    /// `schema_version` column.
    ///
    /// A row counts as version N when every column introduced at N exists and
    /// holds a value; otherwise it falls back to the version below.
    pub fn inferred_version_sql(&self) -> String {
        let mut expr = SchemaVersion::V1.as_i64().to_string();
        for version in SchemaVersion::ALL.iter().skip(1) {
            let introduced: Vec<usize> = (0..FIELD_COUNT)
                .filter(|&i| FIELDS[i].since == *version)
                .collect();
            if introduced.is_empty() || !introduced.iter().all(|&i| self.present[i]) {
                continue;
            }
            let filled = introduced
                .iter()
                .map(|&i| format!("{} IS NOT NULL", FIELDS[i].column))
                .collect::<Vec<_>>()
                .join(" AND ");
            expr = format!(
                "CASE WHEN {} THEN {} ELSE {} END",
                filled,
                version.as_i64(),
                expr
            );
        }
        expr
    }

    /// Projection for reads; missing columns are selected as NULL under their own name.
    pub fn select_list(&self) -> String {
        let mut cols = vec![
            "id".to_string(),
            "name".to_string(),
            "created_at".to_string(),
        ];
        for (present, spec) in self.present.iter().zip(FIELDS.iter()) {
            cols.push(if *present {
                spec.column.to_string()
            } else {
                format!("NULL AS {}", spec.column)
            });
        }
        cols.push(if self.has_schema_version {
            "schema_version".into()
        } else {
            format!("{} AS schema_version", self.inferred_version_sql())
        });
        cols.push(if self.has_revision {
            "revision".into()
        } else {
            "0 AS revision".into()
        });
        cols.join(", ")
    }

    /// Rebuilds a full record from stored values, left to right in [`FIELDS`] order.
    ///
    /// Fields introduced after `version`, or whose column is missing, take their
    /// default. A NULL in a field the row's version requires is an error.
    pub fn decode(
        &self,
        version: SchemaVersion,
        stored: &[Option<FieldValue>; FIELD_COUNT],
    ) -> Result<InputRecord, CoreError> {
        let mut values = [FieldValue::Amount(0.0); FIELD_COUNT];
        for (i, spec) in FIELDS.iter().enumerate() {
            values[i] = if !self.present[i] || spec.since > version {
                FieldValue::default_for(spec)
            } else {
                stored[i].ok_or_else(|| {
                    CoreError::Persistence(format!(
                        "snapshot row is missing `{}` required by schema v{}",
                        spec.column,
                        version.as_i64()
                    ))
                })?
            };
        }
        from_columns(&values)
    }
}
