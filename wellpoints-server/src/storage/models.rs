use crate::storage::schema::{points, sessions};
use chrono::NaiveDate;
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, AsChangeset)]
#[diesel(table_name = points)]
pub struct Points {
    pub id: i32,
    pub username: String,
    pub date: NaiveDate,
    pub exercise: i32,
    pub meals: i32,
    pub alcohol: i32,
}

impl Points {
    pub fn total(&self) -> i32 {
        self.exercise + self.meals + self.alcohol
    }
}

#[derive(Insertable)]
#[diesel(table_name = points)]
pub struct NewPoints<'a> {
    pub username: &'a str,
    pub date: NaiveDate,
    pub exercise: i32,
    pub meals: i32,
    pub alcohol: i32,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession<'a> {
    pub jti: &'a str,
    pub username: &'a str,
}
