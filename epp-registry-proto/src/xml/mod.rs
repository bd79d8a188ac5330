//! XML codec between EPP documents and the typed command/response model.
//!
//! Parsing resolves namespaces with [`quick_xml::NsReader`] into a small
//! element tree, then interprets the tree; rendering emits events through
//! [`quick_xml::Writer`] with two-space indentation so documents are
//! byte-stable for golden-file comparison.

mod parse;
mod render;
mod tree;

pub use parse::parse_command;
pub use render::{render_greeting, render_response};

/// Namespace URIs from RFC 5730–5733.
pub const EPP_NS: &str = "urn:ietf:params:xml:ns:epp-1.0";
pub const DOMAIN_NS: &str = "urn:ietf:params:xml:ns:domain-1.0";
pub const HOST_NS: &str = "urn:ietf:params:xml:ns:host-1.0";
pub const CONTACT_NS: &str = "urn:ietf:params:xml:ns:contact-1.0";

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::command::{EppCommand, ResourceCommand, TransferOp};
    use crate::response::{EppResponse, ResData, TrId};
    use crate::result_code::ResultCode;

    fn tr_id() -> TrId {
        TrId {
            cl_trid: Some("ABC-12345".to_string()),
            sv_trid: "SRV-1-1".to_string(),
        }
    }

    #[test]
    fn parse_hello() {
        let xml = br#"<?xml version="1.0"?><epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><hello/></epp>"#;
        assert_eq!(parse_command(xml).unwrap(), EppCommand::Hello);
    }

    #[test]
    fn parse_login() {
        let xml = br#"<?xml version="1.0"?>
            <epp xmlns="urn:ietf:params:xml:ns:epp-1.0">
              <command>
                <login>
                  <clID>NewRegistrar</clID>
                  <pw>foo-BAR2</pw>
                  <options><version>1.0</version><lang>en</lang></options>
                  <svcs><objURI>urn:ietf:params:xml:ns:host-1.0</objURI></svcs>
                </login>
                <clTRID>ABC-12345</clTRID>
              </command>
            </epp>"#;
        match parse_command(xml).unwrap() {
            EppCommand::Login(login) => {
                assert_eq!(login.registrar_id, "NewRegistrar");
                assert_eq!(login.password, "foo-BAR2");
                assert_eq!(login.cl_trid.as_deref(), Some("ABC-12345"));
            }
            other => panic!("expected login, got {other:?}"),
        }
    }

    #[test]
    fn parse_host_create() {
        let xml = br#"<?xml version="1.0"?>
            <epp xmlns="urn:ietf:params:xml:ns:epp-1.0">
              <command>
                <create>
                  <host:create xmlns:host="urn:ietf:params:xml:ns:host-1.0">
                    <host:name>ns1.example.tld</host:name>
                    <host:addr ip="v4">192.0.2.2</host:addr>
                    <host:addr ip="v6">1080:0:0:0:8:800:200C:417A</host:addr>
                  </host:create>
                </create>
                <clTRID>ABC-12345</clTRID>
              </command>
            </epp>"#;
        match parse_command(xml).unwrap() {
            EppCommand::Resource { command, cl_trid } => {
                assert_eq!(cl_trid.as_deref(), Some("ABC-12345"));
                match command {
                    ResourceCommand::HostCreate(create) => {
                        assert_eq!(create.name, "ns1.example.tld");
                        assert_eq!(
                            create.addresses,
                            vec!["192.0.2.2", "1080:0:0:0:8:800:200C:417A"]
                        );
                    }
                    other => panic!("expected host create, got {other:?}"),
                }
            }
            other => panic!("expected resource command, got {other:?}"),
        }
    }

    #[test]
    fn parse_domain_transfer_request() {
        let xml = br#"<?xml version="1.0"?>
            <epp xmlns="urn:ietf:params:xml:ns:epp-1.0">
              <command>
                <transfer op="request">
                  <domain:transfer xmlns:domain="urn:ietf:params:xml:ns:domain-1.0">
                    <domain:name>example.tld</domain:name>
                    <domain:period unit="y">1</domain:period>
                    <domain:authInfo><domain:pw>2fooBAR</domain:pw></domain:authInfo>
                  </domain:transfer>
                </transfer>
                <clTRID>ABC-12346</clTRID>
              </command>
            </epp>"#;
        match parse_command(xml).unwrap() {
            EppCommand::Resource {
                command:
                    ResourceCommand::DomainTransfer {
                        op,
                        name,
                        period,
                        auth_info,
                    },
                ..
            } => {
                assert_eq!(op, TransferOp::Request);
                assert_eq!(name, "example.tld");
                assert_eq!(period.unwrap().value, 1);
                assert_eq!(auth_info.as_deref(), Some("2fooBAR"));
            }
            other => panic!("expected domain transfer, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_command(b"<epp><command>").is_err());
        assert!(parse_command(b"not xml at all").is_err());
    }

    #[test]
    fn parse_rejects_unknown_verb() {
        let xml = br#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0">
            <command><frobnicate/></command></epp>"#;
        assert!(parse_command(xml).is_err());
    }

    #[test]
    fn render_host_create_response_golden() {
        let response = EppResponse::success(tr_id()).with_res_data(ResData::HostCreate {
            name: "ns1.example.tld".to_string(),
            creation_time: Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap(),
        });
        let expected = "\
<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>
<epp xmlns=\"urn:ietf:params:xml:ns:epp-1.0\">
  <response>
    <result code=\"1000\">
      <msg>Command completed successfully</msg>
    </result>
    <resData>
      <host:creData xmlns:host=\"urn:ietf:params:xml:ns:host-1.0\">
        <host:name>ns1.example.tld</host:name>
        <host:crDate>2026-08-07T00:00:00Z</host:crDate>
      </host:creData>
    </resData>
    <trID>
      <clTRID>ABC-12345</clTRID>
      <svTRID>SRV-1-1</svTRID>
    </trID>
  </response>
</epp>";
        assert_eq!(render_response(&response), expected);
    }

    #[test]
    fn render_failure_response_golden() {
        let response = EppResponse::failure(
            ResultCode::RequiredParameterMissing,
            "Subordinate hosts must have an ip address",
            tr_id(),
        );
        let expected = "\
<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>
<epp xmlns=\"urn:ietf:params:xml:ns:epp-1.0\">
  <response>
    <result code=\"2003\">
      <msg>Subordinate hosts must have an ip address</msg>
    </result>
    <trID>
      <clTRID>ABC-12345</clTRID>
      <svTRID>SRV-1-1</svTRID>
    </trID>
  </response>
</epp>";
        assert_eq!(render_response(&response), expected);
    }

    #[test]
    fn greeting_mentions_served_objects() {
        let greeting = render_greeting("registry.example", "2026-08-07T00:00:00Z");
        assert!(greeting.contains("<svID>registry.example</svID>"));
        assert!(greeting.contains(DOMAIN_NS));
        assert!(greeting.contains(HOST_NS));
        assert!(greeting.contains(CONTACT_NS));
    }
}
