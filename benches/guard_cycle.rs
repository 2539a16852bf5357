use criterion::{black_box, criterion_group, criterion_main, Criterion};
use privilege_transfer::privilege::names::{SE_BACKUP_NAME, SE_SECURITY_NAME};
use privilege_transfer::{
    Acl, ObjectType, PrivilegeElevator, SecurityDescriptor, SecuritySections, SecurityTarget,
    SimulatedSecurityApi,
};
use std::sync::Arc;

fn benchmark_enable_revert(c: &mut Criterion) {
    let elevator = PrivilegeElevator::new(Arc::new(SimulatedSecurityApi::new()));

    c.bench_function("enable_revert_outermost", |b| {
        b.iter(|| {
            let mut guard = elevator.guard(black_box(SE_SECURITY_NAME)).unwrap();
            guard.enable().unwrap();
            guard.revert().unwrap();
        });
    });

    // keeps the context alive so only the adjust calls are measured
    let _outer = elevator.elevate(SE_BACKUP_NAME).unwrap();
    c.bench_function("enable_revert_nested", |b| {
        b.iter(|| {
            let mut guard = elevator.guard(black_box(SE_SECURITY_NAME)).unwrap();
            guard.enable().unwrap();
            guard.revert().unwrap();
        });
    });
}

fn benchmark_transfer(c: &mut Criterion) {
    let api = Arc::new(SimulatedSecurityApi::new());
    let elevator = PrivilegeElevator::new(api.clone());
    let owner = "S-1-5-32-544".parse().unwrap();
    let mut dacl = Acl::empty();
    dacl.push_access_allowed(0x001F_01FF, &owner).unwrap();
    let descriptor = SecurityDescriptor::new()
        .with_owner(owner)
        .with_dacl(dacl, false)
        .with_sacl(Acl::empty(), false);
    let target = SecurityTarget::name("C:\\bench\\file.txt");

    c.bench_function("transfer_with_audit", |b| {
        b.iter(|| {
            elevator
                .transfer(&target, ObjectType::File, &descriptor, black_box(SecuritySections::ALL))
                .unwrap();
            // the simulated backend records every call
            api.clear_recorded();
        });
    });
}

criterion_group!(benches, benchmark_enable_revert, benchmark_transfer);
criterion_main!(benches);
