//! Authoritative query resolution.
//!
//! [`resolve`] is a pure function from the store state and a question list
//! to response parts; it performs no I/O and never fails: every query maps
//! to NOERROR, NXDOMAIN, or REFUSED. The UDP/TCP handler and the DoH adapter
//! both go through it, so the two transports cannot diverge.

use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::thread_rng;
use trust_dns_proto::op::{Message, MessageType, Query, ResponseCode};
use trust_dns_proto::rr::rdata::{MX, SOA, TXT};
use trust_dns_proto::rr::{Name, RData, Record as WireRecord, RecordType};

use crate::name::normalize_name;
use crate::record::{Record, RecordData, RecordKind, Zone};
use crate::store::Store;

/// Response parts produced for one request.
pub struct Resolution {
    pub response_code: ResponseCode,
    pub answers: Vec<WireRecord>,
    pub authority: Vec<WireRecord>,
}

/// Resolve a question list against the store.
///
/// Answers accumulate across questions; the empty-answer rcode decision
/// (NODATA vs NXDOMAIN vs REFUSED) is made on the first question only.
pub fn resolve(store: &Store, questions: &[Query]) -> Resolution {
    let mut answers = Vec::new();

    for question in questions {
        let qname = normalize_name(&question.name().to_string());
        let owner = question.name().to_lowercase();
        answers.extend(answers_for(store, &qname, &owner, question.query_type()));
    }

    let mut authority = Vec::new();
    let mut response_code = ResponseCode::NoError;

    if answers.is_empty() {
        let (first_name, first_type) = match questions.first() {
            Some(q) => (normalize_name(&q.name().to_string()), q.query_type()),
            None => (".".to_string(), RecordType::ZERO),
        };

        match store.best_zone(&first_name) {
            Some(zone) => {
                if let Some(soa) = soa_record(&zone) {
                    authority.push(soa);
                }
                let supported = matches!(
                    first_type,
                    RecordType::A
                        | RecordType::AAAA
                        | RecordType::TXT
                        | RecordType::CNAME
                        | RecordType::MX
                        | RecordType::ANY
                );
                if !(supported && store.has_name(&first_name)) {
                    response_code = ResponseCode::NXDomain;
                }
            }
            None => response_code = ResponseCode::Refused,
        }
    }

    Resolution {
        response_code,
        answers,
        authority,
    }
}

/// Resolve a full wire message, echoing its question section. Used by the
/// DoH adapter and by wire-level tests.
pub fn resolve_message(store: &Store, request: &Message) -> Message {
    let resolution = resolve(store, request.queries());

    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_authoritative(true)
        .set_response_code(resolution.response_code)
        .add_queries(request.queries().to_vec());
    response.insert_answers(resolution.answers);
    response.insert_name_servers(resolution.authority);
    response
}

fn answers_for(store: &Store, qname: &str, owner: &Name, qtype: RecordType) -> Vec<WireRecord> {
    match qtype {
        RecordType::A => {
            let mut out = address_answers(store, qname, owner, RecordKind::A);
            if out.is_empty() {
                out = cname_answers(store, qname, owner);
            }
            out
        }
        RecordType::AAAA => {
            let mut out = address_answers(store, qname, owner, RecordKind::Aaaa);
            if out.is_empty() {
                out = cname_answers(store, qname, owner);
            }
            out
        }
        RecordType::TXT => {
            let mut out = txt_answers(store, qname, owner);
            if out.is_empty() {
                out = cname_answers(store, qname, owner);
            }
            out
        }
        RecordType::CNAME => cname_answers(store, qname, owner),
        RecordType::MX => mx_answers(store, qname, owner),
        RecordType::NS => ns_answers(store, qname, owner),
        RecordType::SOA => store
            .best_zone(qname)
            .and_then(|zone| soa_record(&zone))
            .into_iter()
            .collect(),
        RecordType::ANY => {
            let mut out = address_answers(store, qname, owner, RecordKind::A);
            out.extend(address_answers(store, qname, owner, RecordKind::Aaaa));
            out.extend(txt_answers(store, qname, owner));
            out.extend(cname_answers(store, qname, owner));
            out.extend(mx_answers(store, qname, owner));
            out
        }
        _ => Vec::new(),
    }
}

/// A or AAAA answers, shuffled uniformly per response for pool rotation.
fn address_answers(store: &Store, qname: &str, owner: &Name, kind: RecordKind) -> Vec<WireRecord> {
    let mut out: Vec<WireRecord> = store
        .get_records(qname, kind.query_type())
        .into_iter()
        .filter_map(|rec| match rec.data {
            RecordData::A(v4) => Some(WireRecord::from_rdata(owner.clone(), rec.ttl, RData::A(v4))),
            RecordData::Aaaa(v6) => {
                Some(WireRecord::from_rdata(owner.clone(), rec.ttl, RData::AAAA(v6)))
            }
            _ => None,
        })
        .collect();
    out.shuffle(&mut thread_rng());
    out
}

fn txt_answers(store: &Store, qname: &str, owner: &Name) -> Vec<WireRecord> {
    store
        .get_records(qname, RecordType::TXT)
        .into_iter()
        .filter_map(|rec| match &rec.data {
            RecordData::Txt(text) => Some(WireRecord::from_rdata(
                owner.clone(),
                rec.ttl,
                RData::TXT(TXT::new(chunk_txt(text))),
            )),
            _ => None,
        })
        .collect()
}

fn cname_answers(store: &Store, qname: &str, owner: &Name) -> Vec<WireRecord> {
    store
        .get_records(qname, RecordType::CNAME)
        .into_iter()
        .filter_map(|rec| match &rec.data {
            RecordData::Cname(target) => {
                let target = Name::from_str(target).ok()?;
                Some(WireRecord::from_rdata(
                    owner.clone(),
                    rec.ttl,
                    RData::CNAME(target),
                ))
            }
            _ => None,
        })
        .collect()
}

/// MX answers sorted ascending by priority, ties broken by target name.
fn mx_answers(store: &Store, qname: &str, owner: &Name) -> Vec<WireRecord> {
    let mut members: Vec<(u16, String, Record)> = store
        .get_records(qname, RecordType::MX)
        .into_iter()
        .filter_map(|rec| match &rec.data {
            RecordData::Mx { priority, target } => Some((*priority, target.clone(), rec.clone())),
            _ => None,
        })
        .collect();
    members.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

    members
        .into_iter()
        .filter_map(|(priority, target, rec)| {
            let exchange = Name::from_str(&target).ok()?;
            Some(WireRecord::from_rdata(
                owner.clone(),
                rec.ttl,
                RData::MX(MX::new(priority, exchange)),
            ))
        })
        .collect()
}

/// NS answers for an exact zone name, served with the zone's SOA TTL.
fn ns_answers(store: &Store, qname: &str, owner: &Name) -> Vec<WireRecord> {
    let Some(zone) = store.get_zone(qname) else {
        return Vec::new();
    };
    zone.ns
        .iter()
        .filter_map(|ns| {
            let ns = Name::from_str(ns).ok()?;
            Some(WireRecord::from_rdata(
                owner.clone(),
                zone.soa_ttl,
                RData::NS(ns),
            ))
        })
        .collect()
}

/// Synthesize the zone SOA. `MNAME` is the first NS entry, falling back to
/// the zone apex when the NS list is empty.
fn soa_record(zone: &Zone) -> Option<WireRecord> {
    let apex = Name::from_str(&zone.name).ok()?;
    let mname = match zone.ns.first() {
        Some(ns) => Name::from_str(ns).ok()?,
        None => apex.clone(),
    };
    let rname = Name::from_str(&format!("hostmaster.{}", zone.name)).ok()?;

    Some(WireRecord::from_rdata(
        apex,
        zone.soa_ttl,
        RData::SOA(SOA::new(mname, rname, zone.serial, 30, 30, 300, zone.soa_ttl)),
    ))
}

/// Split TXT data into wire segments of at most 255 bytes, on character
/// boundaries. Empty text yields a single empty segment.
pub fn chunk_txt(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }

    let mut out = Vec::with_capacity(text.len() / 255 + 1);
    let mut segment = String::new();
    for ch in text.chars() {
        if segment.len() + ch.len_utf8() > 255 {
            out.push(std::mem::take(&mut segment));
        }
        segment.push(ch);
    }
    if !segment.is_empty() {
        out.push(segment);
    }
    out
}
