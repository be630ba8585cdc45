use crate::error::Result;
use crate::export::family_text;
use crate::pipeline::{load_ledger, reconcile};
use crate::reconciler::find_family;
use crate::settings::Settings;

pub fn run(settings: &Settings, family: Option<&str>) -> Result<()> {
    let ledger = load_ledger(settings)?;
    let families = reconcile(settings, &ledger)?;

    match family {
        Some(name) => {
            let report = find_family(&families, name)?;
            print!("{}", family_text(report));
        }
        None if families.is_empty() => println!("No families had data to reconcile."),
        None => {
            let texts: Vec<String> = families.iter().map(family_text).collect();
            print!("{}", texts.join("\n"));
        }
    }
    Ok(())
}
