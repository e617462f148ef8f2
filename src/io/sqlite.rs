use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::ucm::ComputationUnit;
use super::UnitsSink;

const CREATE_TABLE: &str = "
    DROP TABLE IF EXISTS computational_units;
    CREATE TABLE computational_units (
        ID_CASE TEXT PRIMARY KEY,
        ID_CROP TEXT,
        ID_METEO TEXT,
        ID_SOIL TEXT,
        HA REAL
    );
";

/// The `computational_units` table of a SQLite database.
pub struct UnitsDb {
    conn: Connection,
}

impl UnitsDb {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("[io::sqlite] Failed to open database: {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    /// Every stored unit, ordered by case identifier.
    pub fn read_units(&self) -> Result<Vec<ComputationUnit>> {
        let mut stmt = self.conn.prepare(
            "SELECT ID_CASE, ID_CROP, ID_METEO, ID_SOIL, HA FROM computational_units ORDER BY ID_CASE",
        )?;
        let units = stmt
            .query_map([], |row| {
                Ok(ComputationUnit {
                    id_case: row.get(0)?,
                    id_crop: row.get(1)?,
                    id_meteo: row.get(2)?,
                    id_soil: row.get(3)?,
                    area_ha: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(units)
    }
}

impl UnitsSink for UnitsDb {
    /// Replace the table contents. Nothing is kept if any row fails.
    fn write_units(&mut self, units: &[ComputationUnit]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(CREATE_TABLE)?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO computational_units (ID_CASE, ID_CROP, ID_METEO, ID_SOIL, HA) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for unit in units {
                insert
                    .execute(rusqlite::params![unit.id_case, unit.id_crop, unit.id_meteo, unit.id_soil, unit.area_ha])
                    .with_context(|| format!("insert unit {}", unit.id_case))?;
            }
        }
        tx.commit()?;

        log::debug!("[io::sqlite] wrote {} computational units", units.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(case: &str, ha: f64) -> ComputationUnit {
        ComputationUnit {
            id_case: case.into(),
            id_crop: "C1".into(),
            id_meteo: "M1".into(),
            id_soil: "S1".into(),
            area_ha: ha,
        }
    }

    #[test]
    fn rewrite_replaces_previous_rows() {
        let mut db = UnitsDb::open_in_memory().unwrap();
        db.write_units(&[unit("B", 1.0), unit("A", 2.5)]).unwrap();
        db.write_units(&[unit("C", 3.0)]).unwrap();

        assert_eq!(db.read_units().unwrap(), vec![unit("C", 3.0)]);
    }

    #[test]
    fn duplicate_case_rolls_back_the_batch() {
        let mut db = UnitsDb::open_in_memory().unwrap();
        db.write_units(&[unit("A", 1.0)]).unwrap();

        let err = db.write_units(&[unit("B", 1.0), unit("B", 2.0)]).unwrap_err();
        assert!(format!("{err:#}").contains("UNIQUE"));
        assert_eq!(db.read_units().unwrap(), vec![unit("A", 1.0)]);
    }
}
