//! Interpretation of parsed element trees into [`EppCommand`] values.

use chrono::NaiveDate;

use crate::command::{
    ContactCreate, ContactUpdate, DomainCreate, DomainUpdate, EppCommand, HostCreate, HostUpdate,
    Login, Period, PeriodUnit, PostalInfo, ResourceCommand, TransferOp, UpdateAddRemove,
};
use crate::error::{ProtoError, ProtoResult};
use crate::status::StatusValue;
use crate::xml::tree::Elem;
use crate::xml::{CONTACT_NS, DOMAIN_NS, HOST_NS};

/// Parses an inbound EPP document into a typed command.
pub fn parse_command(bytes: &[u8]) -> ProtoResult<EppCommand> {
    let root = Elem::parse(bytes)?;
    if root.name != "epp" {
        return Err(ProtoError::Syntax(format!(
            "expected <epp> root, found <{}>",
            root.name
        )));
    }
    if root.child("hello").is_some() {
        return Ok(EppCommand::Hello);
    }
    let command = root.require("command")?;
    let cl_trid = command.optional_text("clTRID");

    if let Some(login) = command.child("login") {
        return Ok(EppCommand::Login(Login {
            registrar_id: login.require_text("clID")?,
            password: login.require_text("pw")?,
            new_password: login.optional_text("newPW"),
            cl_trid,
        }));
    }
    if command.child("logout").is_some() {
        return Ok(EppCommand::Logout { cl_trid });
    }

    for verb in ["check", "info", "create", "delete", "renew", "transfer", "update"] {
        if let Some(wrapper) = command.child(verb) {
            let resource = parse_resource_command(verb, wrapper)?;
            return Ok(EppCommand::Resource {
                command: resource,
                cl_trid,
            });
        }
    }
    let unknown = command
        .children
        .iter()
        .map(|c| c.name.clone())
        .find(|name| name != "clTRID" && name != "extension")
        .unwrap_or_else(|| "(empty)".to_string());
    Err(ProtoError::UnsupportedCommand(unknown))
}

/// Dispatches on the object namespace of the payload inside a verb wrapper.
fn parse_resource_command(verb: &str, wrapper: &Elem) -> ProtoResult<ResourceCommand> {
    let payload = wrapper
        .children
        .first()
        .ok_or_else(|| ProtoError::MissingElement(format!("{verb} payload")))?;
    match payload.namespace.as_deref() {
        Some(DOMAIN_NS) => parse_domain_command(verb, wrapper, payload),
        Some(HOST_NS) => parse_host_command(verb, payload),
        Some(CONTACT_NS) => parse_contact_command(verb, payload),
        other => Err(ProtoError::UnsupportedObject(
            other.unwrap_or("(no namespace)").to_string(),
        )),
    }
}

fn parse_domain_command(
    verb: &str,
    wrapper: &Elem,
    payload: &Elem,
) -> ProtoResult<ResourceCommand> {
    match verb {
        "check" => Ok(ResourceCommand::DomainCheck {
            names: collect_names(payload),
        }),
        "info" => Ok(ResourceCommand::DomainInfo {
            name: payload.require_text("name")?,
            auth_info: parse_auth_info(payload),
        }),
        "create" => {
            let nameservers = payload
                .child("ns")
                .map(|ns| {
                    ns.children_named("hostObj")
                        .map(|h| h.text().to_string())
                        .collect()
                })
                .unwrap_or_default();
            let contacts = payload
                .children_named("contact")
                .filter_map(|c| {
                    c.attr("type")
                        .map(|t| (t.to_string(), c.text().to_string()))
                })
                .collect();
            Ok(ResourceCommand::DomainCreate(DomainCreate {
                name: payload.require_text("name")?,
                period: parse_period(payload.child("period"))?.unwrap_or_default(),
                registrant: payload.require_text("registrant")?,
                contacts,
                nameservers,
                auth_info: parse_auth_info(payload)
                    .ok_or_else(|| ProtoError::MissingElement("authInfo".to_string()))?,
            }))
        }
        "delete" => Ok(ResourceCommand::DomainDelete {
            name: payload.require_text("name")?,
        }),
        "renew" => {
            let cur_exp = payload.require_text("curExpDate")?;
            let current_expiration_date =
                NaiveDate::parse_from_str(&cur_exp, "%Y-%m-%d").map_err(|e| {
                    ProtoError::BadAttribute {
                        element: "curExpDate".to_string(),
                        attribute: "value".to_string(),
                        detail: e.to_string(),
                    }
                })?;
            Ok(ResourceCommand::DomainRenew {
                name: payload.require_text("name")?,
                current_expiration_date,
                period: parse_period(payload.child("period"))?.unwrap_or_default(),
            })
        }
        "transfer" => {
            let op = match wrapper.attr("op") {
                Some("request") => TransferOp::Request,
                Some("approve") => TransferOp::Approve,
                Some("reject") => TransferOp::Reject,
                Some("cancel") => TransferOp::Cancel,
                Some("query") => TransferOp::Query,
                other => {
                    return Err(ProtoError::BadAttribute {
                        element: "transfer".to_string(),
                        attribute: "op".to_string(),
                        detail: format!("unknown op: {}", other.unwrap_or("(missing)")),
                    })
                }
            };
            Ok(ResourceCommand::DomainTransfer {
                op,
                name: payload.require_text("name")?,
                period: parse_period(payload.child("period"))?,
                auth_info: parse_auth_info(payload),
            })
        }
        "update" => {
            let (add, add_contacts) = parse_domain_add_rem(payload.child("add"))?;
            let (rem, rem_contacts) = parse_domain_add_rem(payload.child("rem"))?;
            let chg = payload.child("chg");
            Ok(ResourceCommand::DomainUpdate(DomainUpdate {
                name: payload.require_text("name")?,
                add,
                rem,
                add_contacts,
                rem_contacts,
                new_registrant: chg.and_then(|c| c.optional_text("registrant")),
                new_auth_info: chg.and_then(parse_auth_info),
            }))
        }
        other => Err(ProtoError::UnsupportedCommand(other.to_string())),
    }
}

fn parse_host_command(verb: &str, payload: &Elem) -> ProtoResult<ResourceCommand> {
    match verb {
        "check" => Ok(ResourceCommand::HostCheck {
            names: collect_names(payload),
        }),
        "info" => Ok(ResourceCommand::HostInfo {
            name: payload.require_text("name")?,
        }),
        "create" => Ok(ResourceCommand::HostCreate(HostCreate {
            name: payload.require_text("name")?,
            addresses: payload
                .children_named("addr")
                .map(|a| a.text().to_string())
                .collect(),
        })),
        "delete" => Ok(ResourceCommand::HostDelete {
            name: payload.require_text("name")?,
        }),
        "update" => Ok(ResourceCommand::HostUpdate(HostUpdate {
            name: payload.require_text("name")?,
            add: parse_host_add_rem(payload.child("add"))?,
            rem: parse_host_add_rem(payload.child("rem"))?,
            new_name: payload.child("chg").and_then(|c| c.optional_text("name")),
        })),
        other => Err(ProtoError::UnsupportedCommand(format!("host {other}"))),
    }
}

fn parse_contact_command(verb: &str, payload: &Elem) -> ProtoResult<ResourceCommand> {
    match verb {
        "check" => Ok(ResourceCommand::ContactCheck {
            ids: payload
                .children_named("id")
                .map(|c| c.text().to_string())
                .collect(),
        }),
        "info" => Ok(ResourceCommand::ContactInfo {
            id: payload.require_text("id")?,
            auth_info: parse_auth_info(payload),
        }),
        "create" => Ok(ResourceCommand::ContactCreate(ContactCreate {
            id: payload.require_text("id")?,
            postal_info: parse_postal_info(payload.require("postalInfo")?)?,
            voice: payload.optional_text("voice"),
            fax: payload.optional_text("fax"),
            email: payload.require_text("email")?,
            auth_info: parse_auth_info(payload)
                .ok_or_else(|| ProtoError::MissingElement("authInfo".to_string()))?,
        })),
        "delete" => Ok(ResourceCommand::ContactDelete {
            id: payload.require_text("id")?,
        }),
        "update" => {
            let chg = payload.child("chg");
            Ok(ResourceCommand::ContactUpdate(ContactUpdate {
                id: payload.require_text("id")?,
                add_statuses: parse_statuses(payload.child("add"))?,
                rem_statuses: parse_statuses(payload.child("rem"))?,
                new_postal_info: chg
                    .and_then(|c| c.child("postalInfo"))
                    .map(parse_postal_info)
                    .transpose()?,
                new_voice: chg.and_then(|c| c.optional_text("voice")),
                new_fax: chg.and_then(|c| c.optional_text("fax")),
                new_email: chg.and_then(|c| c.optional_text("email")),
                new_auth_info: chg.and_then(parse_auth_info),
            }))
        }
        other => Err(ProtoError::UnsupportedCommand(format!("contact {other}"))),
    }
}

fn collect_names(payload: &Elem) -> Vec<String> {
    payload
        .children_named("name")
        .map(|c| c.text().to_string())
        .collect()
}

fn parse_auth_info(elem: &Elem) -> Option<String> {
    elem.child("authInfo")
        .and_then(|a| a.optional_text("pw"))
}

fn parse_period(period: Option<&Elem>) -> ProtoResult<Option<Period>> {
    let Some(period) = period else {
        return Ok(None);
    };
    let unit = match period.attr("unit") {
        None | Some("y") => PeriodUnit::Years,
        Some("m") => PeriodUnit::Months,
        Some(other) => {
            return Err(ProtoError::BadAttribute {
                element: "period".to_string(),
                attribute: "unit".to_string(),
                detail: format!("unknown unit: {other}"),
            })
        }
    };
    let value = period.text().parse::<u32>().map_err(|e| ProtoError::BadAttribute {
        element: "period".to_string(),
        attribute: "value".to_string(),
        detail: e.to_string(),
    })?;
    Ok(Some(Period { value, unit }))
}

/// Host add/rem blocks carry `<addr>` and `<status s="..."/>` children.
fn parse_host_add_rem(block: Option<&Elem>) -> ProtoResult<UpdateAddRemove> {
    let Some(block) = block else {
        return Ok(UpdateAddRemove::default());
    };
    Ok(UpdateAddRemove {
        values: block
            .children_named("addr")
            .map(|a| a.text().to_string())
            .collect(),
        statuses: parse_statuses(Some(block))?,
    })
}

/// Domain add/rem blocks carry `<ns><hostObj>`, `<contact type="...">` and
/// `<status s="..."/>` children; contacts are returned separately.
fn parse_domain_add_rem(
    block: Option<&Elem>,
) -> ProtoResult<(UpdateAddRemove, Vec<(String, String)>)> {
    let Some(block) = block else {
        return Ok((UpdateAddRemove::default(), Vec::new()));
    };
    let values = block
        .child("ns")
        .map(|ns| {
            ns.children_named("hostObj")
                .map(|h| h.text().to_string())
                .collect()
        })
        .unwrap_or_default();
    let statuses = parse_statuses(Some(block))?;
    let contacts = block
        .children_named("contact")
        .filter_map(|c| {
            c.attr("type")
                .map(|t| (t.to_string(), c.text().to_string()))
        })
        .collect();
    Ok((UpdateAddRemove { values, statuses }, contacts))
}

fn parse_statuses(block: Option<&Elem>) -> ProtoResult<Vec<StatusValue>> {
    let Some(block) = block else {
        return Ok(Vec::new());
    };
    block
        .children_named("status")
        .map(|s| {
            let value = s.attr("s").ok_or_else(|| ProtoError::BadAttribute {
                element: "status".to_string(),
                attribute: "s".to_string(),
                detail: "missing".to_string(),
            })?;
            value.parse::<StatusValue>()
        })
        .collect()
}

fn parse_postal_info(postal: &Elem) -> ProtoResult<PostalInfo> {
    let addr = postal.require("addr")?;
    Ok(PostalInfo {
        name: postal.require_text("name")?,
        org: postal.optional_text("org"),
        street: addr
            .children_named("street")
            .map(|s| s.text().to_string())
            .collect(),
        city: addr.require_text("city")?,
        state_or_province: addr.optional_text("sp"),
        postal_code: addr.optional_text("pc"),
        country_code: addr.require_text("cc")?,
    })
}
