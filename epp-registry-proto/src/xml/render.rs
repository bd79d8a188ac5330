//! Rendering of responses and greetings into EPP XML documents.

use std::io;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::response::{
    CheckItem, ContactInfoData, DomainInfoData, EppResponse, HostInfoData, ResData, TransferView,
};
use crate::status::StatusValue;
use crate::xml::{CONTACT_NS, DOMAIN_NS, EPP_NS, HOST_NS};

type W = Writer<Vec<u8>>;

/// Renders a response document with two-space indentation.
#[must_use]
pub fn render_response(response: &EppResponse) -> String {
    // Writing into an in-memory buffer cannot fail.
    try_render_response(response).unwrap_or_default()
}

/// Renders the server greeting. `sv_date` is preformatted so the caller
/// controls the clock.
#[must_use]
pub fn render_greeting(server_id: &str, sv_date: &str) -> String {
    try_render_greeting(server_id, sv_date).unwrap_or_default()
}

fn new_writer() -> W {
    Writer::new_with_indent(Vec::new(), b' ', 2)
}

fn finish(writer: W) -> String {
    String::from_utf8(writer.into_inner()).unwrap_or_default()
}

fn try_render_response(response: &EppResponse) -> io::Result<String> {
    let mut w = new_writer();
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
    start_with(&mut w, "epp", &[("xmlns", EPP_NS)])?;
    start(&mut w, "response")?;

    let code = response.code.value().to_string();
    start_with(&mut w, "result", &[("code", &code)])?;
    leaf(&mut w, "msg", &response.message)?;
    end(&mut w, "result")?;

    if let Some(res_data) = &response.res_data {
        start(&mut w, "resData")?;
        render_res_data(&mut w, res_data)?;
        end(&mut w, "resData")?;
    }

    start(&mut w, "trID")?;
    if let Some(cl_trid) = &response.tr_id.cl_trid {
        leaf(&mut w, "clTRID", cl_trid)?;
    }
    leaf(&mut w, "svTRID", &response.tr_id.sv_trid)?;
    end(&mut w, "trID")?;

    end(&mut w, "response")?;
    end(&mut w, "epp")?;
    Ok(finish(w))
}

fn try_render_greeting(server_id: &str, sv_date: &str) -> io::Result<String> {
    let mut w = new_writer();
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
    start_with(&mut w, "epp", &[("xmlns", EPP_NS)])?;
    start(&mut w, "greeting")?;
    leaf(&mut w, "svID", server_id)?;
    leaf(&mut w, "svDate", sv_date)?;
    start(&mut w, "svcMenu")?;
    leaf(&mut w, "version", "1.0")?;
    leaf(&mut w, "lang", "en")?;
    leaf(&mut w, "objURI", DOMAIN_NS)?;
    leaf(&mut w, "objURI", HOST_NS)?;
    leaf(&mut w, "objURI", CONTACT_NS)?;
    end(&mut w, "svcMenu")?;
    end(&mut w, "greeting")?;
    end(&mut w, "epp")?;
    Ok(finish(w))
}

fn render_res_data(w: &mut W, res_data: &ResData) -> io::Result<()> {
    match res_data {
        ResData::DomainCheck(items) => render_check_data(w, "domain", DOMAIN_NS, "name", items),
        ResData::HostCheck(items) => render_check_data(w, "host", HOST_NS, "name", items),
        ResData::ContactCheck(items) => render_check_data(w, "contact", CONTACT_NS, "id", items),
        ResData::DomainCreate {
            name,
            creation_time,
            expiration_time,
        } => {
            start_with(w, "domain:creData", &[("xmlns:domain", DOMAIN_NS)])?;
            leaf(w, "domain:name", name)?;
            leaf(w, "domain:crDate", &fmt_time(*creation_time))?;
            leaf(w, "domain:exDate", &fmt_time(*expiration_time))?;
            end(w, "domain:creData")
        }
        ResData::HostCreate {
            name,
            creation_time,
        } => {
            start_with(w, "host:creData", &[("xmlns:host", HOST_NS)])?;
            leaf(w, "host:name", name)?;
            leaf(w, "host:crDate", &fmt_time(*creation_time))?;
            end(w, "host:creData")
        }
        ResData::ContactCreate { id, creation_time } => {
            start_with(w, "contact:creData", &[("xmlns:contact", CONTACT_NS)])?;
            leaf(w, "contact:id", id)?;
            leaf(w, "contact:crDate", &fmt_time(*creation_time))?;
            end(w, "contact:creData")
        }
        ResData::DomainRenew {
            name,
            expiration_time,
        } => {
            start_with(w, "domain:renData", &[("xmlns:domain", DOMAIN_NS)])?;
            leaf(w, "domain:name", name)?;
            leaf(w, "domain:exDate", &fmt_time(*expiration_time))?;
            end(w, "domain:renData")
        }
        ResData::DomainInfo(info) => render_domain_info(w, info),
        ResData::HostInfo(info) => render_host_info(w, info),
        ResData::ContactInfo(info) => render_contact_info(w, info),
        ResData::DomainTransfer(view) => render_transfer_view(w, view),
    }
}

fn render_check_data(
    w: &mut W,
    prefix: &str,
    ns: &str,
    id_elem: &str,
    items: &[CheckItem],
) -> io::Result<()> {
    let chk = format!("{prefix}:chkData");
    let cd = format!("{prefix}:cd");
    let id_name = format!("{prefix}:{id_elem}");
    let reason = format!("{prefix}:reason");
    start_with(w, &chk, &[(&format!("xmlns:{prefix}") as &str, ns)])?;
    for item in items {
        start(w, &cd)?;
        let avail = if item.available { "1" } else { "0" };
        let mut elem = BytesStart::new(id_name.as_str());
        elem.push_attribute(("avail", avail));
        w.write_event(Event::Start(elem))?;
        w.write_event(Event::Text(BytesText::new(&item.id)))?;
        w.write_event(Event::End(BytesEnd::new(id_name.as_str())))?;
        if let Some(text) = &item.reason {
            leaf(w, &reason, text)?;
        }
        end(w, &cd)?;
    }
    end(w, &chk)
}

fn render_domain_info(w: &mut W, info: &DomainInfoData) -> io::Result<()> {
    start_with(w, "domain:infData", &[("xmlns:domain", DOMAIN_NS)])?;
    leaf(w, "domain:name", &info.name)?;
    leaf(w, "domain:roid", &info.repo_id)?;
    render_statuses(w, "domain", &info.statuses)?;
    leaf(w, "domain:registrant", &info.registrant)?;
    for (contact_type, contact_id) in &info.contacts {
        let mut elem = BytesStart::new("domain:contact");
        elem.push_attribute(("type", contact_type.as_str()));
        w.write_event(Event::Start(elem))?;
        w.write_event(Event::Text(BytesText::new(contact_id)))?;
        w.write_event(Event::End(BytesEnd::new("domain:contact")))?;
    }
    if !info.nameservers.is_empty() {
        start(w, "domain:ns")?;
        for ns in &info.nameservers {
            leaf(w, "domain:hostObj", ns)?;
        }
        end(w, "domain:ns")?;
    }
    for host in &info.subordinate_hosts {
        leaf(w, "domain:host", host)?;
    }
    leaf(w, "domain:clID", &info.sponsor_registrar)?;
    leaf(w, "domain:crID", &info.creation_registrar)?;
    leaf(w, "domain:crDate", &fmt_time(info.creation_time))?;
    leaf(w, "domain:exDate", &fmt_time(info.expiration_time))?;
    if let Some(up_date) = info.last_update_time {
        leaf(w, "domain:upDate", &fmt_time(up_date))?;
    }
    if let Some(tr_date) = info.last_transfer_time {
        leaf(w, "domain:trDate", &fmt_time(tr_date))?;
    }
    if let Some(auth_info) = &info.auth_info {
        start(w, "domain:authInfo")?;
        leaf(w, "domain:pw", auth_info)?;
        end(w, "domain:authInfo")?;
    }
    end(w, "domain:infData")
}

fn render_host_info(w: &mut W, info: &HostInfoData) -> io::Result<()> {
    start_with(w, "host:infData", &[("xmlns:host", HOST_NS)])?;
    leaf(w, "host:name", &info.name)?;
    leaf(w, "host:roid", &info.repo_id)?;
    render_statuses(w, "host", &info.statuses)?;
    for addr in &info.addresses {
        let ip_version = if addr.contains(':') { "v6" } else { "v4" };
        let mut elem = BytesStart::new("host:addr");
        elem.push_attribute(("ip", ip_version));
        w.write_event(Event::Start(elem))?;
        w.write_event(Event::Text(BytesText::new(addr)))?;
        w.write_event(Event::End(BytesEnd::new("host:addr")))?;
    }
    leaf(w, "host:clID", &info.sponsor_registrar)?;
    leaf(w, "host:crID", &info.creation_registrar)?;
    leaf(w, "host:crDate", &fmt_time(info.creation_time))?;
    if let Some(up_date) = info.last_update_time {
        leaf(w, "host:upDate", &fmt_time(up_date))?;
    }
    if let Some(tr_date) = info.last_transfer_time {
        leaf(w, "host:trDate", &fmt_time(tr_date))?;
    }
    end(w, "host:infData")
}

fn render_contact_info(w: &mut W, info: &ContactInfoData) -> io::Result<()> {
    start_with(w, "contact:infData", &[("xmlns:contact", CONTACT_NS)])?;
    leaf(w, "contact:id", &info.id)?;
    leaf(w, "contact:roid", &info.repo_id)?;
    render_statuses(w, "contact", &info.statuses)?;
    start_with(w, "contact:postalInfo", &[("type", "int")])?;
    leaf(w, "contact:name", &info.name)?;
    end(w, "contact:postalInfo")?;
    leaf(w, "contact:email", &info.email)?;
    leaf(w, "contact:clID", &info.sponsor_registrar)?;
    leaf(w, "contact:crID", &info.creation_registrar)?;
    leaf(w, "contact:crDate", &fmt_time(info.creation_time))?;
    if let Some(up_date) = info.last_update_time {
        leaf(w, "contact:upDate", &fmt_time(up_date))?;
    }
    if let Some(tr_date) = info.last_transfer_time {
        leaf(w, "contact:trDate", &fmt_time(tr_date))?;
    }
    end(w, "contact:infData")
}

fn render_transfer_view(w: &mut W, view: &TransferView) -> io::Result<()> {
    start_with(w, "domain:trnData", &[("xmlns:domain", DOMAIN_NS)])?;
    leaf(w, "domain:name", &view.name)?;
    leaf(w, "domain:trStatus", &view.status)?;
    leaf(w, "domain:reID", &view.gaining_registrar)?;
    leaf(w, "domain:reDate", &fmt_time(view.request_time))?;
    leaf(w, "domain:acID", &view.losing_registrar)?;
    leaf(w, "domain:acDate", &fmt_time(view.action_time))?;
    if let Some(ex_date) = view.expiration_time {
        leaf(w, "domain:exDate", &fmt_time(ex_date))?;
    }
    end(w, "domain:trnData")
}

fn render_statuses(w: &mut W, prefix: &str, statuses: &[StatusValue]) -> io::Result<()> {
    let name = format!("{prefix}:status");
    for status in statuses {
        let mut elem = BytesStart::new(name.as_str());
        elem.push_attribute(("s", status.wire_name()));
        w.write_event(Event::Empty(elem))?;
    }
    Ok(())
}

fn fmt_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn start(w: &mut W, name: &str) -> io::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))
}

fn start_with(w: &mut W, name: &str, attrs: &[(&str, &str)]) -> io::Result<()> {
    let mut elem = BytesStart::new(name);
    for (key, value) in attrs {
        elem.push_attribute((*key, *value));
    }
    w.write_event(Event::Start(elem))
}

fn end(w: &mut W, name: &str) -> io::Result<()> {
    w.write_event(Event::End(BytesEnd::new(name)))
}

fn leaf(w: &mut W, name: &str, text: &str) -> io::Result<()> {
    start(w, name)?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    end(w, name)
}
