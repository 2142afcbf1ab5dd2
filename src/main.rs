use std::{env, fs::File};

use bmod::{helpers::hex_dump, logging, Disassembler, MachO, SectionKind};

fn main() {
    logging::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <file_path>", args[0]);
        return;
    }

    let file_path = &args[1];
    let mut file = match File::open(file_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open file: {}", e);
            return;
        }
    };

    let macho = match MachO::parse(&mut file) {
        Ok(macho) => macho,
        Err(e) => {
            eprintln!("Could not parse {}: {}", file_path, e);
            return;
        }
    };

    for (i, object) in macho.objects.iter().enumerate() {
        println!(
            "{}: {} ({}) {}-bit {}",
            i,
            object.cpu_type,
            object.cpu_subtype,
            object.address_width,
            object.file_kind
        );
        if let Some(uuid) = object.uuid() {
            println!("  UUID: {}", uuid);
        }

        for section in &object.sections {
            println!(
                "  {} {} addr={:#x} size={:#x} offset={:#x}",
                section.kind, section.name, section.address, section.size, section.file_offset
            );
        }

        let disasm = match Disassembler::new(object) {
            Ok(disasm) => Some(disasm),
            Err(e) => {
                eprintln!("Could not disassemble: {}", e);
                None
            }
        };

        for section in &object.sections {
            match section.kind {
                SectionKind::Text => {
                    let Some(disasm) = &disasm else {
                        continue;
                    };
                    println!("\n{} ({}):", section.name, section.kind);
                    match disasm.disassemble(section) {
                        Ok(out) => {
                            for (addr, line) in out.with_addresses(section.address) {
                                println!("{:x}: {}", addr, line.text);
                            }
                        }
                        Err(e) => eprintln!("Could not disassemble {}: {}", section.name, e),
                    }
                }
                SectionKind::CString => {
                    println!("\n{} ({}):", section.name, section.kind);
                    for (addr, string) in section.c_strings() {
                        println!("{:x}: {:?}", addr, string);
                    }
                }
                SectionKind::FunctionStarts => match object.function_starts() {
                    Ok(starts) => {
                        println!("\n{}:", section.kind);
                        for start in starts {
                            let name = object.symbol_table.lookup(start).unwrap_or("");
                            println!("{:x} {}", start, name);
                        }
                    }
                    Err(e) => eprintln!("Could not decode function starts: {}", e),
                },
                SectionKind::String | SectionKind::CodeSignature => {
                    println!("\n{}:", section.kind);
                    println!("{}", hex_dump(section.address, section.data()));
                }
            }
        }
    }
}
