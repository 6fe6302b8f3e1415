use crate::schema::*;
use diesel::prelude::*;
use nodelog_common as common;

#[derive(Queryable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Job {
    pub name: String,
    pub url: String,
}

impl Job {
    pub fn list(connection: &mut SqliteConnection) -> QueryResult<Vec<Job>> {
        jobs::table
            .order_by(jobs::name)
            .select(Job::as_select())
            .load(connection)
    }

    pub fn get(my_name: &str, connection: &mut SqliteConnection) -> QueryResult<Option<Job>> {
        jobs::table
            .filter(jobs::name.eq(my_name))
            .select(Job::as_select())
            .first(connection)
            .optional()
    }

    pub fn insert(&self, connection: &mut SqliteConnection) -> QueryResult<()> {
        diesel::insert_into(jobs::table)
            .values(self)
            .execute(connection)?;
        Ok(())
    }
}

impl From<Job> for common::Job {
    fn from(job: Job) -> common::Job {
        common::Job {
            name: job.name,
            url: job.url,
        }
    }
}

impl From<&common::Job> for Job {
    fn from(job: &common::Job) -> Job {
        Job {
            name: job.name.clone(),
            url: job.url.clone(),
        }
    }
}
