use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use cachedns::protocol::{
    DomainName, Header, Message, Opcode, Question, RData, Rcode, ResourceRecord, RCLASS_IN,
    RTYPE_A,
};

#[allow(non_snake_case)]
fn bench__question(c: &mut Criterion) {
    let message = query_message("www.example.com");

    c.bench_function("serialise/question", |b| {
        b.iter_batched(|| message.clone(), |message| message.to_octets(), BatchSize::SmallInput)
    });

    let serialised = message.to_octets();
    c.bench_function("deserialise/question", |b| {
        b.iter(|| Message::from_octets(black_box(&serialised), Instant::now()))
    });
}

#[allow(non_snake_case)]
fn bench__answer__small(c: &mut Criterion) {
    let request = query_message("www.example.com");
    let message = Message::build_response(
        &request,
        vec![a_record("www.example.com", [1, 1, 1, 1])],
        Instant::now(),
    );

    c.bench_function("serialise/answer/small", |b| {
        b.iter_batched(|| message.clone(), |message| message.to_octets(), BatchSize::SmallInput)
    });

    let serialised = message.to_octets();
    c.bench_function("deserialise/answer/small", |b| {
        b.iter(|| Message::from_octets(black_box(&serialised), Instant::now()))
    });
}

#[allow(non_snake_case)]
fn bench__answer__big(c: &mut Criterion) {
    let request = query_message("www.example.com");
    let count = 128;
    let mut answers = Vec::with_capacity(count);
    for i in 0..count {
        answers.push(a_record(&format!("host-{i}.example.com"), [1, 1, 1, 1]));
    }
    let message = Message::build_response(&request, answers, Instant::now());

    c.bench_function("serialise/answer/big", |b| {
        b.iter_batched(|| message.clone(), |message| message.to_octets(), BatchSize::SmallInput)
    });

    let serialised = message.to_octets();
    c.bench_function("deserialise/answer/big", |b| {
        b.iter(|| Message::from_octets(black_box(&serialised), Instant::now()))
    });
}

fn query_message(name: &str) -> Message {
    Message {
        header: Header {
            id: 1234,
            is_response: false,
            opcode: Opcode::Standard,
            is_authoritative: false,
            is_truncated: false,
            recursion_desired: true,
            recursion_available: false,
            z: false,
            authentic_data: false,
            checking_disabled: false,
            rcode: Rcode::NoError,
            qdcount: 1,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        },
        questions: vec![Question {
            name: DomainName::from_text(name).unwrap(),
            qtype: RTYPE_A,
            qclass: RCLASS_IN,
        }],
        answers: vec![],
        authority: vec![],
        additional: vec![],
    }
}

fn a_record(name: &str, octets: [u8; 4]) -> ResourceRecord {
    ResourceRecord {
        name: DomainName::from_text(name).unwrap(),
        rtype: RTYPE_A,
        rclass: RCLASS_IN,
        ttl: 300,
        rdata: RData::A { octets },
        created_at: Instant::now(),
    }
}

criterion_group!(benches, bench__question, bench__answer__small, bench__answer__big);
criterion_main!(benches);
