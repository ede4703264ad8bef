#!/usr/bin/env cargo
use meter_api::openapi::MeterV1ApiDoc;

fn main() -> anyhow::Result<()> {
    let openapi = MeterV1ApiDoc::openapi();
    let json = serde_json::to_string_pretty(&openapi)?;

    println!("{}", json);
    Ok(())
}
