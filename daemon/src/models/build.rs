use crate::schema::*;
use diesel::prelude::*;
use nodelog_common as common;

#[derive(Queryable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = builds)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Build {
    pub job: String,
    pub number: i32,
    pub start: i64,
    pub duration: i64,
    pub host: String,
    pub result: Option<String>,
    pub failed: Option<i32>,
    pub total: Option<i32>,
}

/// Every mutable column, `None` overwrites with NULL.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = builds)]
#[diesel(treat_none_as_null = true)]
pub struct BuildUpdate<'a> {
    pub start: i64,
    pub duration: i64,
    pub host: &'a str,
    pub result: Option<&'a str>,
    pub failed: Option<i32>,
    pub total: Option<i32>,
}

impl Build {
    pub fn list_for_job(
        my_job: &str,
        connection: &mut SqliteConnection,
    ) -> QueryResult<Vec<Build>> {
        builds::table
            .filter(builds::job.eq(my_job))
            .order_by(builds::number)
            .select(Build::as_select())
            .load(connection)
    }

    pub fn list(connection: &mut SqliteConnection) -> QueryResult<Vec<Build>> {
        builds::table
            .order_by((builds::job, builds::number))
            .select(Build::as_select())
            .load(connection)
    }

    pub fn insert(&self, connection: &mut SqliteConnection) -> QueryResult<()> {
        diesel::insert_into(builds::table)
            .values(self)
            .execute(connection)?;
        Ok(())
    }

    /// Returns the number of affected rows, 0 if the build isn't known.
    pub fn update(&self, connection: &mut SqliteConnection) -> QueryResult<usize> {
        let changes = BuildUpdate {
            start: self.start,
            duration: self.duration,
            host: &self.host,
            result: self.result.as_deref(),
            failed: self.failed,
            total: self.total,
        };
        diesel::update(
            builds::table
                .filter(builds::job.eq(&self.job))
                .filter(builds::number.eq(self.number)),
        )
        .set(&changes)
        .execute(connection)
    }
}

impl From<Build> for common::Build {
    fn from(build: Build) -> common::Build {
        common::Build {
            job: build.job,
            number: build.number,
            start: build.start,
            duration: build.duration,
            host: build.host,
            result: build.result,
            failed: build.failed,
            total: build.total,
        }
    }
}

impl From<&common::Build> for Build {
    fn from(build: &common::Build) -> Build {
        Build {
            job: build.job.clone(),
            number: build.number,
            start: build.start,
            duration: build.duration,
            host: build.host.clone(),
            result: build.result.clone(),
            failed: build.failed,
            total: build.total,
        }
    }
}
