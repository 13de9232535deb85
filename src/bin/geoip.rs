//! GeoIP table tool
//!
//! Usage: geoip <COMMAND>
//!
//! Commands:
//!   build   Convert GeoLite2 country CSVs to a GEO1 table
//!   lookup  Look up IPv4 addresses in a table
//!   config  Print a default core configuration (TOML)

use std::collections::HashMap;
use std::env;
use std::io;
use std::net::Ipv4Addr;

use anyhow::{bail, Context};

use reality_core::geoip::{CountryCode, GeoIpTable, GeoIpTableBuilder};
use reality_core::CoreConfig;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "-h" | "--help" => {
            print_usage();
        }
        "build" => {
            if args.len() < 5 {
                eprintln!("Error: build requires <blocks.csv> <locations.csv> <out.dat>");
                return Ok(());
            }
            let allowed = country_selection(args.get(5).map(String::as_str))?;
            build(&args[2], &args[3], &args[4], allowed)?;
        }
        "lookup" => {
            let (table, ips) = match args.get(2).map(String::as_str) {
                Some("-c") | Some("--config") => {
                    let path = args
                        .get(3)
                        .context("--config requires a file path")?;
                    let config = CoreConfig::from_file(path)?;
                    let table = config
                        .load_geoip()?
                        .context("config has no geoip_path")?;
                    (table, &args[4.min(args.len())..])
                }
                Some(path) => (GeoIpTable::load(path)?, &args[3.min(args.len())..]),
                None => {
                    eprintln!("Error: lookup requires a table path");
                    return Ok(());
                }
            };
            lookup(&table, ips)?;
        }
        "config" => {
            println!("# reality-core configuration");
            println!("{}", CoreConfig::default().to_toml_string()?);
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    println!(
        r#"geoip - build and query GEO1 country tables

USAGE:
    geoip build <BLOCKS_CSV> <LOCATIONS_CSV> <OUT> [CC,CC,... | --all]
    geoip lookup <TABLE> <IP>...
    geoip lookup --config <FILE> <IP>...
    geoip config

COMMANDS:
    build     Convert GeoLite2-Country-Blocks-IPv4.csv and
              GeoLite2-Country-Locations-en.csv to a table. Only the
              listed countries are kept; without a list the default is
              CN,RU,IR,TM,MM,BY,SA,AE,VN,CU. Pass --all to keep every
              country. The sorted country codes written are printed on
              stdout.
    lookup    Print the country of each address, or "--" if none
    config    Print a default configuration in TOML

EXAMPLES:
    Build a table for a few countries:
        geoip build GeoLite2-Country-Blocks-IPv4.csv \
            GeoLite2-Country-Locations-en.csv geoip.dat CN,RU,IR

    Query it:
        geoip lookup geoip.dat 1.0.1.1 8.8.8.8
"#
    );
}

/// Countries kept by `build` when no list is given.
const DEFAULT_COUNTRIES: &str = "CN,RU,IR,TM,MM,BY,SA,AE,VN,CU";

/// `None` keeps every country.
fn country_selection(arg: Option<&str>) -> anyhow::Result<Option<Vec<CountryCode>>> {
    match arg {
        Some("--all") => Ok(None),
        Some(list) => parse_country_list(list).map(Some),
        None => parse_country_list(DEFAULT_COUNTRIES).map(Some),
    }
}

fn parse_country_list(list: &str) -> anyhow::Result<Vec<CountryCode>> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<CountryCode>().map_err(Into::into))
        .collect()
}

fn build(
    blocks_path: &str,
    locations_path: &str,
    out_path: &str,
    allowed: Option<Vec<CountryCode>>,
) -> anyhow::Result<()> {
    let locations = load_locations(locations_path)?;
    tracing::info!("Loaded {} country locations", locations.len());

    let mut builder = match allowed {
        Some(codes) => GeoIpTableBuilder::new().allow_countries(codes),
        None => GeoIpTableBuilder::new(),
    };

    add_blocks(&mut builder, open_csv(blocks_path)?, &locations)
        .with_context(|| format!("reading {}", blocks_path))?;

    let countries = builder.countries();
    let skipped = builder.skipped();
    let table = builder.build()?;
    std::fs::write(out_path, table.as_bytes()).with_context(|| format!("writing {}", out_path))?;

    tracing::info!("Processed {} entries, skipped {}", table.len(), skipped);
    tracing::info!("Unique countries: {}", countries.len());
    tracing::info!(
        "Written {} ({} bytes, {} entries)",
        out_path,
        table.as_bytes().len(),
        table.len()
    );

    for code in countries {
        println!("{}", code);
    }
    Ok(())
}

fn load_locations(path: &str) -> anyhow::Result<HashMap<u32, CountryCode>> {
    read_locations(open_csv(path)?).with_context(|| format!("reading {}", path))
}

fn open_csv(path: &str) -> anyhow::Result<csv::Reader<std::fs::File>> {
    csv_reader()
        .from_path(path)
        .with_context(|| format!("opening {}", path))
}

fn csv_reader() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.trim(csv::Trim::All).flexible(true);
    builder
}

fn column(headers: &csv::StringRecord, name: &str) -> anyhow::Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .with_context(|| format!("CSV has no {:?} column", name))
}

/// Map GeoLite2 `geoname_id` to `country_iso_code`.
fn read_locations<R: io::Read>(
    mut rdr: csv::Reader<R>,
) -> anyhow::Result<HashMap<u32, CountryCode>> {
    let headers = rdr.headers()?.clone();
    let geoname_col = column(&headers, "geoname_id")?;
    let country_col = column(&headers, "country_iso_code")?;

    let mut mapping = HashMap::new();
    for record in rdr.records() {
        let record = record?;
        let id = record.get(geoname_col).unwrap_or("").parse::<u32>();
        let country = CountryCode::from_letters(record.get(country_col).unwrap_or(""));
        if let (Ok(id), Some(country)) = (id, country) {
            mapping.insert(id, country);
        }
    }
    Ok(mapping)
}

/// Feed GeoLite2 block rows into `builder`. A row with no country falls
/// back to `registered_country_geoname_id`.
fn add_blocks<R: io::Read>(
    builder: &mut GeoIpTableBuilder,
    mut rdr: csv::Reader<R>,
    locations: &HashMap<u32, CountryCode>,
) -> anyhow::Result<()> {
    let headers = rdr.headers()?.clone();
    let network_col = column(&headers, "network")?;
    let geoname_col = column(&headers, "geoname_id")?;
    let registered_col = column(&headers, "registered_country_geoname_id").ok();

    for record in rdr.records() {
        let record = record?;
        let network = record.get(network_col).unwrap_or("");
        let mut geoname = record.get(geoname_col).unwrap_or("");
        if geoname.is_empty() {
            geoname = registered_col.and_then(|col| record.get(col)).unwrap_or("");
        }
        if network.is_empty() || geoname.is_empty() {
            builder.skip();
            continue;
        }

        let country = geoname
            .parse::<u32>()
            .ok()
            .and_then(|id| locations.get(&id).copied());
        match country {
            Some(country) => {
                builder
                    .add_cidr(network, country)
                    .with_context(|| format!("bad network {:?}", network))?;
            }
            None => builder.skip(),
        }
    }
    Ok(())
}

fn lookup(table: &GeoIpTable, ips: &[String]) -> anyhow::Result<()> {
    if ips.is_empty() {
        bail!("no addresses given");
    }
    for ip in ips {
        let addr: Ipv4Addr = ip.parse().with_context(|| format!("invalid IPv4 address: {}", ip))?;
        match table.try_lookup(addr) {
            Ok(country) => println!("{}\t{}", addr, country),
            Err(e) if e.is_not_found() => println!("{}\t--", addr),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_locations_quoted() {
        let content = "geoname_id,locale_code,continent_code,continent_name,country_iso_code,country_name,is_in_european_union\n\
                       1814991,en,AS,Asia,CN,\"China, \"\"PRC\"\"\",0\n\
                       6255148,en,EU,Europe,,,0\n";
        let mapping = read_locations(csv_reader().from_reader(content.as_bytes())).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get(&1814991), CountryCode::from_letters("CN").as_ref());

        let bad = "id,country\n1,CN\n";
        assert!(read_locations(csv_reader().from_reader(bad.as_bytes())).is_err());
    }

    #[test]
    fn test_parse_country_list() {
        let codes = parse_country_list("cn,RU,").unwrap();
        assert_eq!(codes.len(), 2);
        assert!(parse_country_list("CN,XYZ").is_err());
    }

    #[test]
    fn test_country_selection_defaults() {
        let defaults = country_selection(None).unwrap().unwrap();
        assert_eq!(defaults.len(), 10);
        assert!(defaults.contains(&CountryCode::from_letters("CU").unwrap()));
        assert!(country_selection(Some("--all")).unwrap().is_none());
        assert_eq!(country_selection(Some("US")).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_add_blocks_default_countries() {
        let mut locations = HashMap::new();
        locations.insert(1814991, CountryCode::from_letters("CN").unwrap());
        locations.insert(6252001, CountryCode::from_letters("US").unwrap());
        let blocks = "network,geoname_id,registered_country_geoname_id\n\
                      1.0.1.0/24,,1814991\n\
                      8.8.8.0/24,6252001,6252001\n\
                      9.9.9.0/24,999,999\n";

        let allowed = country_selection(None).unwrap().unwrap();
        let mut builder = GeoIpTableBuilder::new().allow_countries(allowed);
        add_blocks(&mut builder, csv_reader().from_reader(blocks.as_bytes()), &locations).unwrap();
        let table = builder.build().unwrap();

        let cn = CountryCode::from_letters("CN").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(Ipv4Addr::new(1, 0, 1, 7)), Some(cn));
        assert_eq!(table.lookup(Ipv4Addr::new(8, 8, 8, 8)), None);

        let mut builder = GeoIpTableBuilder::new();
        add_blocks(&mut builder, csv_reader().from_reader(blocks.as_bytes()), &locations).unwrap();
        assert_eq!(builder.skipped(), 1);
        assert_eq!(builder.build().unwrap().len(), 2);
    }
}
