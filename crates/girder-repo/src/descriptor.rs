//! Module descriptor parsing: identity, dependency declarations,
//! configuration exposure, properties, and managed versions.
//!
//! Repositories serve one `<module>` XML document per published version;
//! this is the document `fetch_metadata` and the BOM import read.

use quick_xml::events::Event;
use quick_xml::Reader;

use girder_core::coordinate::ModuleId;
use girder_core::version::ExactVersion;
use girder_util::errors::{GirderError, GirderResult};
use girder_util::pattern::ExcludePattern;

use crate::repository::{ManagedDependency, MetadataDependency, ModuleMetadata};

/// Parse a `<module>` descriptor document.
pub fn parse_descriptor(xml: &str) -> GirderResult<ModuleMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut group: Option<String> = None;
    let mut name: Option<String> = None;
    let mut version: Option<String> = None;
    let mut meta = ModuleMetadata::default();

    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();

    // Temporary accumulators for nested elements
    let mut current_dep: Option<PendingDependency> = None;
    let mut current_exclusion: Option<PendingExclusion> = None;
    let mut in_managed = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                path.push(tag);
                text_buf.clear();

                let ctx = path_context(&path);
                match ctx.as_str() {
                    "module>dependencies>dependency"
                    | "module>managedDependencies>dependency" => {
                        in_managed = ctx.contains("managedDependencies");
                        current_dep = Some(PendingDependency::default());
                    }
                    _ if ctx.ends_with(">exclusion") && current_dep.is_some() => {
                        current_exclusion = Some(PendingExclusion::default());
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                let ctx = path_context(&path);
                let depth = path.len();

                // Properties: <module><properties><key>value</key></properties>
                if depth == 3 && path.get(1).map(|s| s.as_str()) == Some("properties") {
                    let key = path.last().cloned().unwrap_or_default();
                    meta.properties.insert(key, text_buf.clone());
                }

                if let Some(ref mut dep) = current_dep {
                    if let Some(ref mut excl) = current_exclusion {
                        match path.last().map(|s| s.as_str()) {
                            Some("group") => excl.group = text_buf.clone(),
                            Some("name") => excl.name = Some(text_buf.clone()),
                            _ => {}
                        }
                        if ctx.ends_with(">exclusion") {
                            if let Some(excl) = current_exclusion.take() {
                                dep.exclusions.push(excl.compile()?);
                            }
                        }
                    } else {
                        match path.last().map(|s| s.as_str()) {
                            Some("group") if ctx.ends_with(">dependency>group") => {
                                dep.group = text_buf.clone();
                            }
                            Some("name") if ctx.ends_with(">dependency>name") => {
                                dep.name = text_buf.clone();
                            }
                            Some("version") if ctx.ends_with(">dependency>version") => {
                                dep.version = Some(text_buf.clone());
                            }
                            Some("conf") if ctx.ends_with(">configurations>conf") => {
                                dep.configurations.push(text_buf.clone());
                            }
                            Some("optional") if ctx.ends_with(">dependency>optional") => {
                                dep.optional = text_buf.trim() == "true";
                            }
                            _ => {}
                        }
                    }

                    if ctx == "module>dependencies>dependency"
                        || ctx == "module>managedDependencies>dependency"
                    {
                        if let Some(dep) = current_dep.take() {
                            if dep.group.is_empty() || dep.name.is_empty() {
                                return Err(GirderError::Generic {
                                    message: "descriptor dependency missing <group> or <name>"
                                        .to_string(),
                                });
                            }
                            if in_managed {
                                meta.managed.push(ManagedDependency {
                                    id: ModuleId::new(dep.group, dep.name),
                                    version: dep.version.unwrap_or_default(),
                                });
                            } else {
                                meta.dependencies.push(dep.into_dependency());
                            }
                        }
                        in_managed = false;
                    }
                }

                // Top-level module identity
                if depth == 2 {
                    match path.last().map(|s| s.as_str()) {
                        Some("group") => group = Some(text_buf.clone()),
                        Some("name") => name = Some(text_buf.clone()),
                        Some("version") => version = Some(text_buf.clone()),
                        _ => {}
                    }
                }

                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(GirderError::Generic {
                    message: format!("Failed to parse module descriptor: {e}"),
                });
            }
            _ => {}
        }
    }

    let (Some(group), Some(name), Some(version)) = (group, name, version) else {
        return Err(GirderError::Generic {
            message: "module descriptor missing <group>, <name>, or <version>".to_string(),
        });
    };
    meta.id = ModuleId::new(group, name);
    meta.version = ExactVersion::parse(&version);
    Ok(meta)
}

#[derive(Debug, Default)]
struct PendingDependency {
    group: String,
    name: String,
    version: Option<String>,
    configurations: Vec<String>,
    optional: bool,
    exclusions: Vec<ExcludePattern>,
}

impl PendingDependency {
    fn into_dependency(self) -> MetadataDependency {
        let configurations = if self.configurations.is_empty() {
            vec!["default".to_string()]
        } else {
            self.configurations
        };
        MetadataDependency {
            id: ModuleId::new(self.group, self.name),
            version: self.version,
            configurations,
            optional: self.optional,
            exclusions: self.exclusions,
        }
    }
}

#[derive(Debug, Default)]
struct PendingExclusion {
    group: String,
    name: Option<String>,
}

impl PendingExclusion {
    fn compile(self) -> GirderResult<ExcludePattern> {
        match self.name {
            Some(name) => ExcludePattern::parse(&format!("{}:{name}", self.group)),
            None => ExcludePattern::parse(&self.group),
        }
    }
}

/// Build a context string from the current XML path for matching.
fn path_context(path: &[String]) -> String {
    path.join(">")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<module>
    <group>org.example</group>
    <name>my-lib</name>
    <version>1.0.0</version>

    <properties>
        <slf4j.version>2.0.13</slf4j.version>
    </properties>

    <dependencies>
        <dependency>
            <group>org.slf4j</group>
            <name>slf4j-api</name>
            <version>${slf4j.version}</version>
            <configurations>
                <conf>default</conf>
                <conf>runtime</conf>
            </configurations>
        </dependency>
        <dependency>
            <group>junit</group>
            <name>junit</name>
            <version>4.13.2</version>
            <configurations>
                <conf>test</conf>
            </configurations>
        </dependency>
    </dependencies>
</module>"#;

    #[test]
    fn parse_simple_descriptor() {
        let meta = parse_descriptor(SIMPLE).unwrap();
        assert_eq!(meta.id, ModuleId::new("org.example", "my-lib"));
        assert_eq!(meta.version, ExactVersion::parse("1.0.0"));
        assert_eq!(meta.dependencies.len(), 2);
        assert_eq!(meta.properties.get("slf4j.version").unwrap(), "2.0.13");
        assert_eq!(
            meta.dependencies[0].configurations,
            vec!["default", "runtime"]
        );
    }

    #[test]
    fn property_interpolation_after_parse() {
        let mut meta = parse_descriptor(SIMPLE).unwrap();
        meta.resolve_properties();
        assert_eq!(meta.dependencies[0].version.as_deref(), Some("2.0.13"));
    }

    #[test]
    fn missing_configuration_defaults() {
        let xml = r#"<module>
            <group>g</group><name>a</name><version>1.0</version>
            <dependencies>
                <dependency><group>g2</group><name>b</name><version>1.0</version></dependency>
            </dependencies>
        </module>"#;
        let meta = parse_descriptor(xml).unwrap();
        assert_eq!(meta.dependencies[0].configurations, vec!["default"]);
    }

    #[test]
    fn managed_dependencies_parsed() {
        let xml = r#"<module>
            <group>org.example</group><name>bom</name><version>1.0</version>
            <properties>
                <okio.version>3.9.0</okio.version>
            </properties>
            <managedDependencies>
                <dependency>
                    <group>com.squareup.okio</group>
                    <name>okio</name>
                    <version>${okio.version}</version>
                </dependency>
            </managedDependencies>
        </module>"#;
        let meta = parse_descriptor(xml).unwrap();
        assert_eq!(meta.managed.len(), 1);
        assert!(meta.dependencies.is_empty());
        assert_eq!(meta.managed[0].id, ModuleId::new("com.squareup.okio", "okio"));
    }

    #[test]
    fn exclusions_parsed() {
        let xml = r#"<module>
            <group>g</group><name>a</name><version>1.0</version>
            <dependencies>
                <dependency>
                    <group>g2</group><name>b</name><version>1.0</version>
                    <exclusions>
                        <exclusion>
                            <group>commons-logging</group>
                            <name>commons-logging</name>
                        </exclusion>
                        <exclusion>
                            <group>org.slf4j</group>
                        </exclusion>
                    </exclusions>
                </dependency>
            </dependencies>
        </module>"#;
        let meta = parse_descriptor(xml).unwrap();
        let excl = &meta.dependencies[0].exclusions;
        assert_eq!(excl.len(), 2);
        assert!(excl[0].matches("commons-logging", "commons-logging"));
        assert!(excl[1].matches("org.slf4j", "anything"));
    }

    #[test]
    fn optional_flag_parsed() {
        let xml = r#"<module>
            <group>g</group><name>a</name><version>1.0</version>
            <dependencies>
                <dependency>
                    <group>g2</group><name>b</name><version>1.0</version>
                    <optional>true</optional>
                </dependency>
            </dependencies>
        </module>"#;
        let meta = parse_descriptor(xml).unwrap();
        assert!(meta.dependencies[0].optional);
    }

    #[test]
    fn missing_identity_rejected() {
        let xml = "<module><group>g</group><name>a</name></module>";
        assert!(parse_descriptor(xml).is_err());
    }

    #[test]
    fn dependency_without_name_rejected() {
        let xml = r#"<module>
            <group>g</group><name>a</name><version>1.0</version>
            <dependencies>
                <dependency><group>g2</group><version>1.0</version></dependency>
            </dependencies>
        </module>"#;
        assert!(parse_descriptor(xml).is_err());
    }
}
