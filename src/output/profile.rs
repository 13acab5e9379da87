use std::path::Path;

use log::{debug, info};
use serde_yaml::{Mapping, Value};

use crate::config::ProxyGroup;
use crate::error::{Error, Result};
use crate::proxy::Proxy;

/// Clash Meta profile loaded from a template. Keys are kept in template order.
#[derive(Debug)]
pub struct Profile {
    root: Mapping,
}

impl Profile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let root: Value = serde_yaml::from_str(content)?;
        match root {
            Value::Mapping(root) => Ok(Self { root }),
            _ => Err(Error::InvalidField {
                field: "template",
                value: "top level is not a mapping".into(),
            }),
        }
    }

    /// Replaces the `proxies` list and rewrites the members of every allow-listed group.
    pub fn apply(&mut self, proxies: &[Proxy], group_names: &[&str]) -> Result<()> {
        self.root
            .insert("proxies".into(), serde_yaml::to_value(proxies)?);

        let names: Vec<String> = proxies.iter().map(|p| p.name().to_string()).collect();
        if let Some(Value::Sequence(groups)) = self.root.get_mut("proxy-groups") {
            for group in groups.iter_mut() {
                let view: ProxyGroup = serde_yaml::from_value(group.clone())?;
                if !group_names.contains(&view.name.as_str()) {
                    continue;
                }
                debug!(
                    "[Profile] group {} ({}): {} -> {} members",
                    view.name,
                    view.group_type,
                    view.proxies.len(),
                    names.len()
                );
                if let Value::Mapping(fields) = group {
                    fields.insert("proxies".into(), serde_yaml::to_value(&names)?);
                }
            }
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

/// Renders `template` with the collected proxies into `output`.
pub fn write_profile(
    template: &Path,
    output: &Path,
    proxies: &[Proxy],
    group_names: &[&str],
) -> Result<()> {
    let mut profile = Profile::load(template)?;
    profile.apply(proxies, group_names)?;
    profile.save(output)?;
    info!(
        "[Profile] wrote {} proxies to {}",
        proxies.len(),
        output.display()
    );
    Ok(())
}
