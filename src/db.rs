use std::fs;

use postgres::{Client, NoTls};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::zone::Domain;

/// Schema bootstrap file, read from the working directory.
const SCHEMA_FILE: &str = "schema.sql";

/// One grouped query pulls every domain with its record tables
/// aggregated to JSON, so decoding stays a single round trip.
const DOMAIN_QUERY: &str = "\
select d.id::int as id, d.name, \
array_to_json(array_agg(distinct a))::text as a, \
array_to_json(array_agg(distinct c))::text as cname, \
array_to_json(array_agg(distinct dk))::text as dkim, \
array_to_json(array_agg(distinct dm))::text as dmarc, \
array_to_json(array_agg(distinct m))::text as mx, \
array_to_json(array_agg(distinct n))::text as ns, \
array_to_json(array_agg(distinct spf))::text as spf \
from domains d \
left outer join arecords a on a.domainid = d.id \
left outer join cnamerecords c on c.domainid = d.id \
left outer join dkimrecords dk on dk.domainid = d.id \
left outer join dmarcrecords dm on dm.domainid = d.id \
left outer join mxrecords m on m.domainid = d.id \
left outer join nsrecords n on n.domainid = d.id \
left outer join spfrecords spf on spf.domainid = d.id \
group by d.id, d.name \
order by d.name";

/// Port to the relational store. The core treats this as an opaque
/// source of raw domain rows.
pub trait DnsBackend {
    fn create_schema(&mut self) -> Result<()>;
    fn get_domains(&mut self) -> Result<Vec<Domain>>;
}

/// Production adapter over a Postgres database.
pub struct PostgresBackend {
    client: Client,
}

impl PostgresBackend {
    pub fn connect(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        database: &str,
    ) -> Result<Self> {
        let client = postgres::Config::new()
            .host(host)
            .port(port)
            .user(user)
            .password(password)
            .dbname(database)
            .connect(NoTls)
            .map_err(|e| Error::DataSource(format!("unable to connect to database: {}", e)))?;
        Ok(Self { client })
    }
}

impl DnsBackend for PostgresBackend {
    /// Bootstrap the schema from `schema.sql` unless the domains table
    /// already exists.
    fn create_schema(&mut self) -> Result<()> {
        let found = self
            .client
            .query_opt(
                "select 1 from information_schema.tables \
                 where table_schema = 'public' and table_name = 'domains'",
                &[],
            )
            .map_err(|e| Error::DataSource(e.to_string()))?;
        if found.is_some() {
            debug!("schema already present");
            return Ok(());
        }
        let schema = fs::read_to_string(SCHEMA_FILE)
            .map_err(|e| Error::Io(format!("cannot read {}: {}", SCHEMA_FILE, e)))?;
        self.client
            .batch_execute(&schema)
            .map_err(|e| Error::DataSource(format!("schema creation failed: {}", e)))?;
        info!("created database schema");
        Ok(())
    }

    fn get_domains(&mut self) -> Result<Vec<Domain>> {
        let rows = self
            .client
            .query(DOMAIN_QUERY, &[])
            .map_err(|e| Error::DataSource(format!("unable to retrieve domains: {}", e)))?;

        let mut domains = Vec::with_capacity(rows.len());
        for row in rows {
            let mut domain = Domain::new(column::<String>(&row, "name")?);
            domain.id = column(&row, "id")?;
            domain.a_records = decode_rows(&column::<String>(&row, "a")?)?;
            domain.cname_records = decode_rows(&column::<String>(&row, "cname")?)?;
            domain.dkim_records = decode_rows(&column::<String>(&row, "dkim")?)?;
            domain.dmarc_records = decode_rows(&column::<String>(&row, "dmarc")?)?;
            domain.mx_records = decode_rows(&column::<String>(&row, "mx")?)?;
            domain.ns_records = decode_rows(&column::<String>(&row, "ns")?)?;
            domain.spf_records = decode_rows(&column::<String>(&row, "spf")?)?;

            // distinct aggregation has no defined order; sort so record
            // synthesis (and thus the idempotence check) is deterministic
            domain.ns_records.sort_by_key(|r| (r.sort_order, r.value.clone()));
            domain.mx_records.sort_by_key(|r| (r.priority, r.value.clone()));
            domain.a_records.sort_by_key(|r| r.name.clone());
            domain.cname_records.sort_by_key(|r| r.name.clone());
            domain.dkim_records.sort_by_key(|r| r.name.clone());
            domain.dmarc_records.sort_by_key(|r| r.name.clone());
            domain.spf_records.sort_by_key(|r| r.name.clone());
            domains.push(domain);
        }
        Ok(domains)
    }
}

fn column<'a, T: postgres::types::FromSql<'a>>(
    row: &'a postgres::Row,
    name: &str,
) -> Result<T> {
    row.try_get(name)
        .map_err(|e| Error::DataSource(format!("bad column {}: {}", name, e)))
}

/// Decode one aggregated JSON column. Domains without rows in a record
/// table aggregate to `[null]`; mixed groups can interleave null rows.
fn decode_rows<T: DeserializeOwned>(json: &str) -> Result<Vec<T>> {
    if json.is_empty() || json == "[null]" {
        return Ok(Vec::new());
    }
    let rows: Vec<Option<T>> = serde_json::from_str(json)
        .map_err(|e| Error::DataSource(format!("cannot decode record rows: {}", e)))?;
    Ok(rows.into_iter().flatten().collect())
}
